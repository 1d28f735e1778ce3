//! Event feed for observing entity lifecycle notifications.
//!
//! The engine emits an event when the validator rejects an entity, when a
//! write or read reaches the store, and when a stored document is removed.
//!
//! # Usage
//!
//! ```rust
//! use docsync_core::{doc, Engine, EntityEvent, Schema, SyncOptions};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let engine = Engine::in_memory();
//! let users = Schema::builder("user").database("app").collection("users").build();
//! let events = engine.subscribe();
//!
//! let mut user = engine.entity(&users, doc! { "username" => "me" });
//! user.save(doc! {}, SyncOptions::new()).await.unwrap();
//!
//! assert!(matches!(events.try_recv(), Ok(EntityEvent::Synced { .. })));
//! # });
//! ```

use crate::error::ValidationError;
use crate::types::Verb;
use docsync_document::{Document, ObjectId};
use parking_lot::RwLock;
use std::sync::mpsc::{self, Receiver, Sender};

/// A lifecycle notification about one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityEvent {
    /// The validator rejected the entity; nothing was written.
    Invalid {
        /// Schema name.
        schema: String,
        /// The entity's attributes as the validator left them.
        document: Document,
        /// The validator's error.
        error: ValidationError,
    },
    /// A create, read, update or patch reached the store.
    Synced {
        /// Schema name.
        schema: String,
        /// Entity identity.
        id: ObjectId,
        /// Verb that was performed.
        verb: Verb,
    },
    /// A delete reached the store.
    Destroyed {
        /// Schema name.
        schema: String,
        /// Entity identity.
        id: ObjectId,
        /// Number of documents the store removed.
        deleted: u64,
    },
}

impl EntityEvent {
    /// Returns the schema name of the entity.
    pub fn schema(&self) -> &str {
        match self {
            Self::Invalid { schema, .. }
            | Self::Synced { schema, .. }
            | Self::Destroyed { schema, .. } => schema,
        }
    }
}

/// A feed that distributes entity events to subscribers.
///
/// The feed:
/// - Preserves emission order
/// - Supports multiple subscribers
/// - Keeps a bounded, sequence-numbered history for polling
/// - Is thread-safe
pub struct EventFeed {
    subscribers: RwLock<Vec<Sender<EntityEvent>>>,
    history: RwLock<Vec<(u64, EntityEvent)>>,
    next_sequence: RwLock<u64>,
    max_history: usize,
}

impl EventFeed {
    /// Creates a feed keeping 1024 events.
    pub fn new() -> Self {
        Self::with_max_history(1024)
    }

    /// Creates a feed with a specific history limit.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            history: RwLock::new(Vec::new()),
            next_sequence: RwLock::new(1),
            max_history,
        }
    }

    /// Subscribes to the feed.
    ///
    /// Returns a receiver that will receive all future events.
    pub fn subscribe(&self) -> Receiver<EntityEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Emits an event to all subscribers, returning its sequence number.
    pub fn emit(&self, event: EntityEvent) -> u64 {
        let sequence = {
            let mut next = self.next_sequence.write();
            let sequence = *next;
            *next += 1;
            sequence
        };

        {
            let mut history = self.history.write();
            history.push((sequence, event.clone()));
            if history.len() > self.max_history {
                let to_remove = history.len() - self.max_history;
                history.drain(0..to_remove);
            }
        }

        // Disconnected subscribers are dropped.
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        sequence
    }

    /// Returns events with sequence > cursor, up to limit.
    pub fn poll(&self, cursor: u64, limit: usize) -> Vec<(u64, EntityEvent)> {
        let history = self.history.read();
        history
            .iter()
            .filter(|(sequence, _)| *sequence > cursor)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Returns the latest sequence number in history.
    pub fn latest_sequence(&self) -> u64 {
        self.history.read().last().map_or(0, |(sequence, _)| *sequence)
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Returns the number of events in history.
    pub fn history_len(&self) -> usize {
        self.history.read().len()
    }
}

impl Default for EventFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventFeed")
            .field("subscribers", &self.subscriber_count())
            .field("history", &self.history_len())
            .field("max_history", &self.max_history)
            .finish()
    }
}
