//! Engine facade.

use crate::collection::Collection;
use crate::config::Config;
use crate::entity::Entity;
use crate::error::CoreResult;
use crate::events::{EntityEvent, EventFeed};
use crate::schema::Schema;
use docsync_document::Document;
use docsync_store::{ConnectionProvider, MemoryProvider, Namespace, SharedHandle};
use parking_lot::RwLock;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

/// The entry point tying entities to a store.
///
/// An `Engine` holds the configuration, the connection provider every entity
/// obtains its store handle from, and the event feed. It is cheap to clone;
/// clones share all of it.
///
/// # Opening an Engine
///
/// ```rust
/// use docsync_core::{doc, Config, Engine, MemoryProvider, Schema, SyncOptions};
/// use std::sync::Arc;
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let engine = Engine::new(
///     Config::new().default_database("app"),
///     Arc::new(MemoryProvider::new()),
/// );
/// let users = Schema::builder("user").collection("users").build();
///
/// let mut user = engine.entity(&users, doc! { "username" => "me" });
/// user.save(doc! {}, SyncOptions::new()).await.unwrap();
/// assert!(user.is_stored());
///
/// engine.close().await.unwrap();
/// # });
/// ```
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: Config,
    provider: Arc<dyn ConnectionProvider>,
    events: EventFeed,
    is_open: RwLock<bool>,
}

impl Engine {
    /// Creates an engine over `provider`.
    pub fn new(config: Config, provider: Arc<dyn ConnectionProvider>) -> Self {
        let events = EventFeed::with_max_history(config.event_history);
        Self {
            inner: Arc::new(EngineInner {
                config,
                provider,
                events,
                is_open: RwLock::new(true),
            }),
        }
    }

    /// Creates an engine over a fresh in-memory store with default settings.
    pub fn in_memory() -> Self {
        Self::new(Config::default(), Arc::new(MemoryProvider::new()))
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Returns the connection provider.
    pub fn provider(&self) -> &Arc<dyn ConnectionProvider> {
        &self.inner.provider
    }

    /// Returns the event feed.
    pub fn events(&self) -> &EventFeed {
        &self.inner.events
    }

    /// Subscribes to entity events.
    pub fn subscribe(&self) -> Receiver<EntityEvent> {
        self.inner.events.subscribe()
    }

    /// Creates a new, unsaved entity.
    pub fn entity(&self, schema: &Arc<Schema>, attributes: Document) -> Entity {
        Entity::new(self, schema, attributes)
    }

    /// Creates an entity for a document already in the store.
    pub fn stored_entity(&self, schema: &Arc<Schema>, document: Document) -> Entity {
        Entity::from_stored(self, schema, document)
    }

    /// Creates an empty collection.
    pub fn collection(&self, schema: &Arc<Schema>) -> Collection {
        Collection::new(self, schema)
    }

    /// Obtains the store handle for `namespace`.
    ///
    /// # Errors
    ///
    /// Returns the provider's error unchanged.
    pub async fn handle(&self, namespace: &Namespace) -> CoreResult<SharedHandle> {
        tracing::trace!(%namespace, "obtaining handle");
        let handle = self
            .inner
            .provider
            .obtain_handle(&namespace.database, &namespace.collection)
            .await?;
        Ok(handle)
    }

    /// Closes the provider. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if releasing connections fails.
    pub async fn close(&self) -> CoreResult<()> {
        {
            let mut is_open = self.inner.is_open.write();
            if !*is_open {
                return Ok(());
            }
            *is_open = false;
        }
        tracing::debug!("closing engine");
        self.inner.provider.close().await?;
        Ok(())
    }

    /// Returns true until [`Engine::close`] is called.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.inner.is_open.read()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("is_open", &self.is_open())
            .field("default_database", &self.inner.config.default_database)
            .field("events", &self.inner.events)
            .finish_non_exhaustive()
    }
}
