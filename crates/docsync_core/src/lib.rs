//! # docsync core
//!
//! Entity synchronization and lifecycle hook engine for document stores.
//!
//! This crate provides:
//! - [`Entity`], a record mutated locally and synchronized with
//!   [`Entity::sync`], `save`, `fetch` and `destroy`
//! - [`Schema`], the per-type declaration of destination, validator,
//!   attribute-scoped before/after hooks and embedded children
//! - [`Collection`], an ordered group of entities reconciled with the store by
//!   a smart sync (one bulk insert for new members, concurrent updates for
//!   stored ones)
//! - [`Engine`], the facade holding the configuration, the connection
//!   provider and the [`EventFeed`]
//!
//! ## Sync Pipeline
//!
//! Each entity sync runs these steps in order:
//!
//! 1. Resolve the verb (create for new entities, update for stored ones)
//! 2. Resolve the destination, failing before any store contact
//! 3. Run the validation gate for writes
//! 4. Run before-hooks
//! 5. Sync embedded children, depth first
//! 6. Run the store operation and the state transition
//! 7. Run after-hooks
//!
//! ## Example
//!
//! ```rust
//! use docsync_core::{doc, hook_fn, Engine, Schema, SyncOptions, Value};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let users = Schema::builder("user")
//!     .database("app")
//!     .collection("users")
//!     .before(
//!         "create username",
//!         hook_fn(|ctx, value| {
//!             if let Value::Text(name) = value {
//!                 ctx.set("username", name.to_lowercase());
//!             }
//!             Ok(())
//!         }),
//!     )
//!     .build();
//!
//! let engine = Engine::in_memory();
//! let mut user = engine.entity(&users, doc! { "username" => "ME" });
//! user.sync(None, SyncOptions::new()).await.unwrap();
//!
//! assert!(user.is_stored());
//! assert_eq!(user.get("username"), Some(&Value::from("me")));
//! # });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collection;
mod config;
mod destination;
mod engine;
mod entity;
mod error;
mod events;
mod hooks;
mod schema;
mod sync;
mod types;

pub use collection::{Collection, CollectionOutput, DeleteReport, EntityOutcome, SyncReport};
pub use config::Config;
pub use destination::Destination;
pub use engine::Engine;
pub use entity::{Embedded, Entity, EntityState, IdentityResolver, Transition};
pub use error::{CoreError, CoreResult, HookError, ValidationError};
pub use events::{EntityEvent, EventFeed};
pub use hooks::{hook_fn, Binding, Hook, HookContext, HookResult, HookTable, SharedHook};
pub use schema::{EmbedSpec, Schema, SchemaBuilder, Validator};
pub use sync::{SyncOptions, SyncOutput};
pub use types::{HookPhase, HookPoint, Verb};

pub use docsync_document::{doc, Document, ObjectId, Value};
pub use docsync_store::{
    ConnectionProvider, Filter, MemoryProvider, Namespace, SharedHandle, StoreError,
    StoreHandle, StoreOptions,
};
