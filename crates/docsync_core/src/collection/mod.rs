//! Ordered groups of entities sharing one destination.
//!
//! A [`Collection`] owns its member entities. Syncing it reconciles the
//! members against the store with as few operations as possible: new members
//! are inserted in one bulk write, existing members are updated one by one
//! and concurrently.
//!
//! ```
//! use docsync_core::{doc, Engine, Schema, SyncOptions};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let engine = Engine::in_memory();
//! let users = Schema::builder("user").database("app").collection("users").build();
//!
//! let mut group = engine.collection(&users);
//! group.add(doc! { "username" => "first" });
//! group.add(doc! { "username" => "second" });
//!
//! let output = group.sync(None, SyncOptions::new()).await.unwrap();
//! assert_eq!(output.synced().unwrap().records().len(), 2);
//! assert!(group.iter().all(|user| user.is_stored()));
//! # });
//! ```

mod reconcile;
mod report;

pub use report::{CollectionOutput, DeleteReport, EntityOutcome, SyncReport};

use crate::destination::Destination;
use crate::engine::Engine;
use crate::entity::Entity;
use crate::error::CoreResult;
use crate::schema::Schema;
use docsync_document::{Document, ObjectId};
use docsync_store::{Filter, Namespace, SharedHandle};
use std::fmt;
use std::sync::Arc;

/// An ordered sequence of entities of one schema.
///
/// Members need not have distinct identities in memory; the store treats
/// equal identities as the same record.
pub struct Collection {
    engine: Engine,
    schema: Arc<Schema>,
    entities: Vec<Entity>,
    destination: Destination,
}

impl Collection {
    /// Creates an empty collection.
    pub fn new(engine: &Engine, schema: &Arc<Schema>) -> Self {
        Self {
            engine: engine.clone(),
            schema: Arc::clone(schema),
            entities: Vec::new(),
            destination: Destination::default(),
        }
    }

    /// Creates a collection of new entities built from `documents`.
    pub fn with_documents<I>(engine: &Engine, schema: &Arc<Schema>, documents: I) -> Self
    where
        I: IntoIterator<Item = Document>,
    {
        let mut collection = Self::new(engine, schema);
        for doc in documents {
            collection.add(doc);
        }
        collection
    }

    /// Creates a collection owning `entities`.
    pub fn with_entities<I>(engine: &Engine, schema: &Arc<Schema>, entities: I) -> Self
    where
        I: IntoIterator<Item = Entity>,
    {
        let mut collection = Self::new(engine, schema);
        for entity in entities {
            collection.add_entity(entity);
        }
        collection
    }

    /// The schema of new members.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Adds a new entity built from `attributes` and returns it.
    pub fn add(&mut self, attributes: Document) -> &mut Entity {
        let entity = Entity::new(&self.engine, &self.schema, attributes);
        self.add_entity(entity)
    }

    /// Adds an existing entity and returns it.
    pub fn add_entity(&mut self, mut entity: Entity) -> &mut Entity {
        entity.inherit(&self.destination);
        let index = self.entities.len();
        self.entities.push(entity);
        &mut self.entities[index]
    }

    /// Removes the first member with identity `id`.
    ///
    /// The stored record, if any, is left alone.
    pub fn remove(&mut self, id: ObjectId) -> Option<Entity> {
        let pos = self.entities.iter().position(|e| e.id() == id)?;
        Some(self.entities.remove(pos))
    }

    /// The first member with identity `id`.
    pub fn get(&self, id: ObjectId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id() == id)
    }

    /// The first member with identity `id`, mutably.
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id() == id)
    }

    /// The member at `index`.
    pub fn at(&self, index: usize) -> Option<&Entity> {
        self.entities.get(index)
    }

    /// The member at `index`, mutably.
    pub fn at_mut(&mut self, index: usize) -> Option<&mut Entity> {
        self.entities.get_mut(index)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if there are no members.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterates members in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.entities.iter()
    }

    /// Iterates members mutably in order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Entity> {
        self.entities.iter_mut()
    }

    /// The first member whose document matches `filter`.
    pub fn find_where(&self, filter: &Filter) -> Option<&Entity> {
        self.entities
            .iter()
            .find(|e| filter.matches(&e.to_document()))
    }

    /// Sets the database for the collection and its members.
    pub fn use_database(&mut self, database: impl Into<String>) -> &mut Self {
        self.destination.database = Some(database.into());
        self.propagate();
        self
    }

    /// Sets the collection name for the collection and its members.
    pub fn define_collection(&mut self, collection: impl Into<String>) -> &mut Self {
        self.destination.collection = Some(collection.into());
        self.propagate();
        self
    }

    /// The explicitly set destination.
    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Resolves where the collection syncs to.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Configuration`](crate::CoreError::Configuration)
    /// if the database or collection cannot be resolved.
    pub fn namespace(&self) -> CoreResult<Namespace> {
        Destination::resolve(
            &self.destination,
            &Destination::default(),
            &self.schema,
            self.engine.config(),
        )
    }

    /// Returns the live store handle for the collection's namespace.
    ///
    /// # Errors
    ///
    /// Fails like [`Collection::namespace`], or with the provider's error.
    pub async fn handle(&self) -> CoreResult<SharedHandle> {
        let namespace = self.namespace()?;
        self.engine.handle(&namespace).await
    }

    fn propagate(&mut self) {
        for entity in &mut self.entities {
            entity.inherit(&self.destination);
        }
    }

    fn replace_members(&mut self, documents: &[Document]) {
        self.entities = documents
            .iter()
            .map(|doc| {
                let mut entity = Entity::from_stored(&self.engine, &self.schema, doc.clone());
                entity.inherit(&self.destination);
                entity
            })
            .collect();
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Entity;
    type IntoIter = std::slice::Iter<'a, Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("schema", &self.schema.name())
            .field("destination", &self.destination)
            .field("len", &self.entities.len())
            .finish()
    }
}
