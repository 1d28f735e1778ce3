//! Store handle and connection provider traits.

use crate::error::StoreResult;
use crate::query::{Filter, Namespace, StoreOptions, UpdateOutcome};
use async_trait::async_trait;
use docsync_document::Document;
use std::sync::Arc;

/// A live handle on one collection of a document store.
///
/// Handles are shared by every entity targeting the same namespace. They hold
/// no per-entity state and take no exclusive locks, so concurrent writes to
/// one document resolve however the store resolves them.
///
/// # Invariants
///
/// - `insert` returns the documents as stored, each carrying its identity
/// - `update` applies `set` field by field to every matching document
/// - `remove` reports how many documents it deleted, 0 when none matched
/// - Options are handed to the store untouched
///
/// # Implementors
///
/// - [`super::MemoryStore`] - For tests and ephemeral data
#[async_trait]
pub trait StoreHandle: Send + Sync {
    /// Returns the namespace this handle writes to.
    fn namespace(&self) -> &Namespace;

    /// Inserts documents, assigning identities where missing.
    ///
    /// # Errors
    ///
    /// Returns an error if an identity is already taken or the store fails.
    async fn insert(&self, docs: Vec<Document>, options: &StoreOptions)
        -> StoreResult<Vec<Document>>;

    /// Sets the attributes of `set` on every document matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if `set` tries to change an existing identity or the
    /// store fails.
    async fn update(
        &self,
        filter: &Filter,
        set: Document,
        options: &StoreOptions,
    ) -> StoreResult<UpdateOutcome>;

    /// Returns documents matching `filter`, in storage order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    async fn find(&self, filter: &Filter, options: &StoreOptions) -> StoreResult<Vec<Document>>;

    /// Removes documents matching `filter`, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    async fn remove(&self, filter: &Filter, options: &StoreOptions) -> StoreResult<u64>;

    /// Returns the first document matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    async fn find_one(
        &self,
        filter: &Filter,
        options: &StoreOptions,
    ) -> StoreResult<Option<Document>> {
        let mut options = options.clone();
        options.limit = Some(1);
        Ok(self.find(filter, &options).await?.into_iter().next())
    }
}

/// A store handle shared between entities.
pub type SharedHandle = Arc<dyn StoreHandle>;

/// Hands out store handles by database and collection name.
///
/// `obtain_handle` must be idempotent: asking twice for the same namespace
/// returns handles onto the same documents.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// Returns a handle on `database.collection`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or has been closed.
    async fn obtain_handle(&self, database: &str, collection: &str) -> StoreResult<SharedHandle>;

    /// Releases connections. Handles obtained earlier may fail afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if closing fails.
    async fn close(&self) -> StoreResult<()> {
        Ok(())
    }
}
