//! In-memory document store for tests and ephemeral data.

use crate::error::{StoreError, StoreResult};
use crate::handle::{ConnectionProvider, SharedHandle, StoreHandle};
use crate::query::{Filter, Namespace, StoreOptions, UpdateOutcome};
use async_trait::async_trait;
use docsync_document::{Document, ObjectId, Value};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default name of the identity field.
pub const DEFAULT_IDENTITY_FIELD: &str = "_id";

/// An in-memory collection.
///
/// Documents are held in insertion order. Every read hands out clones, so
/// callers never alias stored data.
///
/// # Thread Safety
///
/// The store is thread-safe and can be shared across tasks. Locks are never
/// held across an await point.
///
/// # Example
///
/// ```rust
/// use docsync_document::doc;
/// use docsync_store::{Filter, MemoryStore, Namespace, StoreHandle, StoreOptions};
///
/// # tokio_test_block_on(async {
/// let store = MemoryStore::new(Namespace::new("app", "users"));
/// let opts = StoreOptions::new();
/// store.insert(vec![doc! { "username" => "me" }], &opts).await.unwrap();
/// let found = store.find(&Filter::eq("username", "me"), &opts).await.unwrap();
/// assert_eq!(found.len(), 1);
/// assert!(found[0].contains_key("_id"));
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    namespace: Namespace,
    identity: String,
    latency: Option<Duration>,
    closed: Arc<AtomicBool>,
    records: RwLock<Vec<Document>>,
}

impl MemoryStore {
    /// Creates an empty store using `_id` as the identity field.
    #[must_use]
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            identity: DEFAULT_IDENTITY_FIELD.to_string(),
            latency: None,
            closed: Arc::new(AtomicBool::new(false)),
            records: RwLock::new(Vec::new()),
        }
    }

    /// Returns the identity field name.
    pub fn identity_field(&self) -> &str {
        &self.identity
    }

    /// Returns the number of stored documents.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Returns a copy of every stored document.
    ///
    /// Useful for testing and debugging.
    pub fn documents(&self) -> Vec<Document> {
        self.records.read().clone()
    }

    /// Removes every stored document.
    pub fn clear(&self) {
        self.records.write().clear();
    }

    async fn round_trip(&self) -> StoreResult<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn identity_of<'a>(&self, doc: &'a Document) -> Option<&'a Value> {
        doc.get(&self.identity)
    }

    fn duplicate_key(&self, value: &Value) -> StoreError {
        StoreError::DuplicateKey {
            namespace: self.namespace.to_string(),
            field: self.identity.clone(),
            value: render(value),
        }
    }

    fn with_identity(&self, doc: Document) -> Document {
        if doc.contains_key(&self.identity) {
            return doc;
        }
        let mut stored = Document::with_capacity(doc.len() + 1);
        stored.insert(self.identity.clone(), ObjectId::new());
        stored.merge(doc);
        stored
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::ObjectId(id) => format!("ObjectId('{id}')"),
        Value::Text(s) => format!("\"{s}\""),
        other => format!("{other:?}"),
    }
}

#[async_trait]
impl StoreHandle for MemoryStore {
    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    async fn insert(
        &self,
        docs: Vec<Document>,
        _options: &StoreOptions,
    ) -> StoreResult<Vec<Document>> {
        self.round_trip().await?;

        let docs: Vec<Document> = docs.into_iter().map(|d| self.with_identity(d)).collect();
        let mut records = self.records.write();

        // The batch is checked as a whole so a duplicate leaves the store untouched.
        let mut taken: Vec<&Value> = records.iter().filter_map(|d| self.identity_of(d)).collect();
        for doc in &docs {
            if let Some(id) = self.identity_of(doc) {
                if taken.contains(&id) {
                    return Err(self.duplicate_key(id));
                }
                taken.push(id);
            }
        }
        records.extend(docs.iter().cloned());

        tracing::trace!(namespace = %self.namespace, count = docs.len(), "inserted documents");
        Ok(docs)
    }

    async fn update(
        &self,
        filter: &Filter,
        set: Document,
        options: &StoreOptions,
    ) -> StoreResult<UpdateOutcome> {
        self.round_trip().await?;

        let mut records = self.records.write();
        let matching: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, d)| filter.matches(d))
            .map(|(i, _)| i)
            .collect();

        if set.contains_key(&self.identity) && !(options.upsert && matching.is_empty()) {
            return Err(StoreError::identity_mutation(&self.identity));
        }

        if matching.is_empty() {
            if !options.upsert {
                return Ok(UpdateOutcome::default());
            }
            let mut created = filter.clauses().clone();
            created.merge(set);
            let created = self.with_identity(created);
            let id = self.identity_of(&created).cloned();
            if let Some(id) = &id {
                if records.iter().any(|d| self.identity_of(d) == Some(id)) {
                    return Err(self.duplicate_key(id));
                }
            }
            records.push(created);
            tracing::trace!(namespace = %self.namespace, "upserted document");
            return Ok(UpdateOutcome {
                matched: 0,
                modified: 0,
                upserted: id,
            });
        }

        let mut modified = 0;
        for &index in &matching {
            let doc = &mut records[index];
            let mut changed = false;
            for (key, value) in set.iter() {
                if doc.get(key) != Some(value) {
                    doc.insert(key, value.clone());
                    changed = true;
                }
            }
            if changed {
                modified += 1;
            }
        }

        tracing::trace!(namespace = %self.namespace, matched = matching.len(), modified, "updated documents");
        Ok(UpdateOutcome {
            matched: matching.len() as u64,
            modified,
            upserted: None,
        })
    }

    async fn find(&self, filter: &Filter, options: &StoreOptions) -> StoreResult<Vec<Document>> {
        self.round_trip().await?;

        let docs = self.documents();
        let limit = options.limit.unwrap_or(usize::MAX);
        let found = docs
            .into_iter()
            .filter(|d| filter.matches(d))
            .take(limit)
            .map(|d| match &options.fields {
                Some(fields) => {
                    let mut keep: Vec<&str> = fields.iter().map(String::as_str).collect();
                    keep.push(&self.identity);
                    d.project(&keep[..])
                }
                None => d,
            })
            .collect();
        Ok(found)
    }

    async fn remove(&self, filter: &Filter, _options: &StoreOptions) -> StoreResult<u64> {
        self.round_trip().await?;

        let mut records = self.records.write();
        let before = records.len();
        records.retain(|doc| !filter.matches(doc));

        let removed = (before - records.len()) as u64;
        tracing::trace!(namespace = %self.namespace, removed, "removed documents");
        Ok(removed)
    }
}

/// A connection provider backed by in-memory stores.
///
/// Hands out one shared [`MemoryStore`] per namespace, so repeated calls for
/// the same database and collection see the same documents.
#[derive(Debug)]
pub struct MemoryProvider {
    stores: RwLock<HashMap<Namespace, Arc<MemoryStore>>>,
    identity: String,
    latency: Option<Duration>,
    closed: Arc<AtomicBool>,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProvider {
    /// Creates a provider with no stores.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stores: RwLock::new(HashMap::new()),
            identity: DEFAULT_IDENTITY_FIELD.to_string(),
            latency: None,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Delays every store round trip by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Uses `field` as the identity field of every store.
    #[must_use]
    pub fn with_identity_field(mut self, field: impl Into<String>) -> Self {
        self.identity = field.into();
        self
    }

    /// Returns the store for `namespace`, creating it if needed.
    pub fn store(&self, namespace: &Namespace) -> Arc<MemoryStore> {
        if let Some(store) = self.stores.read().get(namespace) {
            return Arc::clone(store);
        }
        let mut stores = self.stores.write();
        let store = stores.entry(namespace.clone()).or_insert_with(|| {
            Arc::new(MemoryStore {
                namespace: namespace.clone(),
                identity: self.identity.clone(),
                latency: self.latency,
                closed: Arc::clone(&self.closed),
                records: RwLock::new(Vec::new()),
            })
        });
        Arc::clone(store)
    }

    /// Returns every namespace a store has been created for.
    pub fn namespaces(&self) -> Vec<Namespace> {
        let mut names: Vec<Namespace> = self.stores.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns true once [`ConnectionProvider::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl ConnectionProvider for MemoryProvider {
    async fn obtain_handle(&self, database: &str, collection: &str) -> StoreResult<SharedHandle> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        if database.is_empty() || collection.is_empty() {
            return Err(StoreError::driver(
                73,
                format!("Invalid namespace specified '{database}.{collection}'"),
            ));
        }
        let store: SharedHandle = self.store(&Namespace::new(database, collection));
        Ok(store)
    }

    async fn close(&self) -> StoreResult<()> {
        self.closed.store(true, Ordering::Release);
        tracing::debug!(stores = self.stores.read().len(), "memory provider closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsync_document::doc;

    fn store() -> MemoryStore {
        MemoryStore::new(Namespace::new("app", "users"))
    }

    fn opts() -> StoreOptions {
        StoreOptions::new()
    }

    #[tokio::test]
    async fn memory_new_is_empty() {
        let store = store();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
        assert!(store.documents().is_empty());
    }

    #[tokio::test]
    async fn insert_assigns_identity_first() {
        let store = store();
        let inserted = store
            .insert(vec![doc! { "username" => "test" }], &opts())
            .await
            .unwrap();
        assert_eq!(inserted.len(), 1);
        assert_eq!(inserted[0].keys().collect::<Vec<_>>(), vec!["_id", "username"]);
        assert!(inserted[0].get("_id").unwrap().as_object_id().is_some());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn insert_keeps_given_identity() {
        let store = store();
        let id = ObjectId::new();
        let inserted = store
            .insert(vec![doc! { "_id" => id, "a" => 1 }], &opts())
            .await
            .unwrap();
        assert_eq!(inserted[0].get("_id"), Some(&Value::ObjectId(id)));
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_identity() {
        let store = store();
        let id = ObjectId::new();
        store.insert(vec![doc! { "_id" => id }], &opts()).await.unwrap();

        let err = store
            .insert(vec![doc! { "a" => 1 }, doc! { "_id" => id }], &opts())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
        assert_eq!(err.code(), Some(11000));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn insert_rejects_duplicates_within_batch() {
        let store = store();
        let err = store
            .insert(vec![doc! { "_id" => 1 }, doc! { "_id" => 1 }], &opts())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn update_sets_fields() {
        let store = store();
        let inserted = store
            .insert(vec![doc! { "username" => "test", "email" => "a@b" }], &opts())
            .await
            .unwrap();
        let id = inserted[0].get("_id").unwrap().clone();

        let outcome = store
            .update(&Filter::eq("_id", id.clone()), doc! { "username" => "changed" }, &opts())
            .await
            .unwrap();
        assert_eq!(outcome.matched, 1);
        assert_eq!(outcome.modified, 1);

        let found = store.find_one(&Filter::eq("_id", id), &opts()).await.unwrap().unwrap();
        assert_eq!(found.get("username"), Some(&Value::from("changed")));
        assert_eq!(found.get("email"), Some(&Value::from("a@b")));
    }

    #[tokio::test]
    async fn update_without_change_is_not_modified() {
        let store = store();
        store.insert(vec![doc! { "a" => 1 }], &opts()).await.unwrap();
        let outcome = store
            .update(&Filter::eq("a", 1), doc! { "a" => 1 }, &opts())
            .await
            .unwrap();
        assert_eq!(outcome.matched, 1);
        assert_eq!(outcome.modified, 0);
    }

    #[tokio::test]
    async fn update_rejects_identity_in_set() {
        let store = store();
        let id = ObjectId::new();
        let err = store
            .update(&Filter::eq("_id", id), doc! { "_id" => id, "username" => "x" }, &opts())
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::identity_mutation("_id"));
        assert_eq!(err.to_string(), "Mod on _id not allowed");
    }

    #[tokio::test]
    async fn upsert_creates_from_filter_and_set() {
        let store = store();
        let id = ObjectId::new();
        let outcome = store
            .update(
                &Filter::eq("_id", id),
                doc! { "_id" => id, "username" => "upsert" },
                &opts().upsert(true),
            )
            .await
            .unwrap();
        assert_eq!(outcome.upserted, Some(Value::ObjectId(id)));
        assert_eq!(outcome.written(), 1);

        let found = store.find_one(&Filter::eq("_id", id), &opts()).await.unwrap().unwrap();
        assert_eq!(found.get("username"), Some(&Value::from("upsert")));

        // A second upsert of the identity now matches an existing document.
        let err = store
            .update(&Filter::eq("_id", id), doc! { "_id" => id }, &opts().upsert(true))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::IdentityMutation { .. }));
    }

    #[tokio::test]
    async fn update_without_match_or_upsert_is_a_noop() {
        let store = store();
        let outcome = store
            .update(&Filter::eq("a", 1), doc! { "b" => 2 }, &opts())
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::default());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn find_projection_and_limit() {
        let store = store();
        store
            .insert(
                vec![
                    doc! { "username" => "a", "email" => "a@x", "c" => 1 },
                    doc! { "username" => "b", "email" => "b@x", "c" => 1 },
                    doc! { "username" => "c", "email" => "c@x", "c" => 2 },
                ],
                &opts(),
            )
            .await
            .unwrap();

        let found = store.find(&Filter::eq("c", 1), &opts()).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].get("username"), Some(&Value::from("a")));

        let projected = store
            .find(&Filter::all(), &opts().fields(["username"]).limit(2))
            .await
            .unwrap();
        assert_eq!(projected.len(), 2);
        assert_eq!(projected[0].keys().collect::<Vec<_>>(), vec!["_id", "username"]);
    }

    #[tokio::test]
    async fn remove_counts_deleted() {
        let store = store();
        store
            .insert(vec![doc! { "a" => 1 }, doc! { "a" => 1 }, doc! { "a" => 2 }], &opts())
            .await
            .unwrap();
        assert_eq!(store.remove(&Filter::eq("a", 1), &opts()).await.unwrap(), 2);
        assert_eq!(store.remove(&Filter::eq("a", 1), &opts()).await.unwrap(), 0);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn stored_documents_are_copies() {
        let store = store();
        let mut inserted = store.insert(vec![doc! { "a" => 1 }], &opts()).await.unwrap();
        inserted[0].insert("a", 99);
        let found = store.find(&Filter::all(), &opts()).await.unwrap();
        assert_eq!(found[0].get("a"), Some(&Value::Integer(1)));
    }

    #[tokio::test]
    async fn provider_is_idempotent() {
        let provider = MemoryProvider::new();
        let first = provider.obtain_handle("app", "users").await.unwrap();
        first.insert(vec![doc! { "a" => 1 }], &opts()).await.unwrap();

        let second = provider.obtain_handle("app", "users").await.unwrap();
        assert_eq!(second.find(&Filter::all(), &opts()).await.unwrap().len(), 1);
        assert_eq!(second.namespace(), &Namespace::new("app", "users"));
        assert_eq!(provider.namespaces(), vec![Namespace::new("app", "users")]);
    }

    #[tokio::test]
    async fn provider_rejects_empty_names() {
        let provider = MemoryProvider::new();
        let err = provider.obtain_handle("", "users").await.err().unwrap();
        assert_eq!(err.code(), Some(73));
    }

    #[tokio::test]
    async fn close_fails_later_calls() {
        let provider = MemoryProvider::new();
        let handle = provider.obtain_handle("app", "users").await.unwrap();
        provider.close().await.unwrap();
        assert!(provider.is_closed());

        let err = handle.find(&Filter::all(), &opts()).await.unwrap_err();
        assert_eq!(err, StoreError::Closed);
        assert!(matches!(
            provider.obtain_handle("app", "users").await,
            Err(StoreError::Closed)
        ));
    }

    #[tokio::test]
    async fn custom_identity_field() {
        let provider = MemoryProvider::new().with_identity_field("key");
        let store = provider.store(&Namespace::new("app", "users"));
        assert_eq!(store.identity_field(), "key");
        let inserted = store.insert(vec![doc! { "a" => 1 }], &opts()).await.unwrap();
        assert!(inserted[0].contains_key("key"));
        assert!(!inserted[0].contains_key("_id"));
    }

    #[tokio::test]
    async fn latency_delays_round_trips() {
        let provider = MemoryProvider::new().with_latency(Duration::from_millis(50));
        let handle = provider.obtain_handle("app", "users").await.unwrap();
        let started = tokio::time::Instant::now();
        handle.find(&Filter::all(), &opts()).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
