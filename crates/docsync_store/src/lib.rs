//! # docsync store
//!
//! Document store contracts and an in-memory store for docsync.
//!
//! The engine never talks to a database driver directly. It asks a
//! [`ConnectionProvider`] for a [`StoreHandle`] on a [`Namespace`] and issues
//! four calls against it: insert, update, find and remove. Errors the store
//! reports come back as [`StoreError`] and are surfaced unchanged.
//!
//! ## Design Principles
//!
//! - Handles are shared, hold no per-entity state and take no exclusive locks
//! - Store options are passed through untouched
//! - Providers are idempotent per namespace
//! - Must be `Send + Sync` for concurrent access
//!
//! ## Available Stores
//!
//! - [`MemoryProvider`] / [`MemoryStore`] - For testing and ephemeral data
//!
//! ## Example
//!
//! ```rust
//! use docsync_document::doc;
//! use docsync_store::{ConnectionProvider, Filter, MemoryProvider, StoreOptions};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let provider = MemoryProvider::new();
//! let users = provider.obtain_handle("app", "users").await.unwrap();
//! let opts = StoreOptions::new();
//! users.insert(vec![doc! { "username" => "me" }], &opts).await.unwrap();
//! assert_eq!(users.remove(&Filter::eq("username", "me"), &opts).await.unwrap(), 1);
//! # });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod handle;
mod memory;
mod query;

pub use error::{StoreError, StoreResult};
pub use handle::{ConnectionProvider, SharedHandle, StoreHandle};
pub use memory::{MemoryProvider, MemoryStore, DEFAULT_IDENTITY_FIELD};
pub use query::{Filter, Namespace, StoreOptions, UpdateOutcome};
