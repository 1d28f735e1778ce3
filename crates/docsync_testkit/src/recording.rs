//! Store wrappers that record every call and can inject failures.
//!
//! Tests use these to assert how many store operations a sync issued and to
//! make a chosen operation fail.

use async_trait::async_trait;
use docsync_document::Document;
use docsync_store::{
    ConnectionProvider, Filter, MemoryProvider, MemoryStore, Namespace, SharedHandle,
    StoreError, StoreHandle, StoreOptions, StoreResult, UpdateOutcome,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// A store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// Handle acquisition.
    Obtain,
    /// Insert.
    Insert,
    /// Update.
    Update,
    /// Find.
    Find,
    /// Remove.
    Remove,
}

/// One recorded store call.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreCall {
    /// The operation.
    pub op: StoreOp,
    /// Where it was sent.
    pub namespace: Namespace,
    /// Documents sent with an insert, 0 for other operations.
    pub documents: usize,
    /// The update payload, if any.
    pub payload: Option<Document>,
    /// The options the call carried.
    pub options: StoreOptions,
}

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<StoreCall>>,
    faults: Mutex<Vec<(StoreOp, StoreError)>>,
}

impl Recorder {
    fn record(&self, call: StoreCall) -> StoreResult<()> {
        let op = call.op;
        self.calls.lock().push(call);
        let mut faults = self.faults.lock();
        match faults.iter().position(|(fault, _)| *fault == op) {
            Some(pos) => Err(faults.remove(pos).1),
            None => Ok(()),
        }
    }
}

/// A [`ConnectionProvider`] over a [`MemoryProvider`] that records calls.
#[derive(Clone)]
pub struct RecordingProvider {
    inner: Arc<MemoryProvider>,
    recorder: Arc<Recorder>,
}

impl RecordingProvider {
    /// Creates a recording provider over a fresh memory store.
    pub fn new() -> Self {
        Self::over(MemoryProvider::new())
    }

    /// Creates a recording provider over `inner`.
    pub fn over(inner: MemoryProvider) -> Self {
        Self {
            inner: Arc::new(inner),
            recorder: Arc::new(Recorder::default()),
        }
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.recorder.calls.lock().clone()
    }

    /// Number of calls of `op` so far.
    pub fn count(&self, op: StoreOp) -> usize {
        self.recorder.calls.lock().iter().filter(|c| c.op == op).count()
    }

    /// Number of data operations so far, excluding handle acquisition.
    pub fn operations(&self) -> usize {
        self.recorder
            .calls
            .lock()
            .iter()
            .filter(|c| c.op != StoreOp::Obtain)
            .count()
    }

    /// Forgets recorded calls.
    pub fn reset(&self) {
        self.recorder.calls.lock().clear();
    }

    /// Makes the next call of `op` fail with `error`.
    ///
    /// The call is still recorded and never reaches the store.
    pub fn fail_next(&self, op: StoreOp, error: StoreError) {
        self.recorder.faults.lock().push((op, error));
    }

    /// The backing memory store of `namespace`.
    pub fn store(&self, namespace: &Namespace) -> Arc<MemoryStore> {
        self.inner.store(namespace)
    }

    /// Stored documents of `database.collection`.
    pub fn documents(&self, database: &str, collection: &str) -> Vec<Document> {
        self.store(&Namespace::new(database, collection)).documents()
    }
}

impl Default for RecordingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectionProvider for RecordingProvider {
    async fn obtain_handle(&self, database: &str, collection: &str) -> StoreResult<SharedHandle> {
        self.recorder.record(StoreCall {
            op: StoreOp::Obtain,
            namespace: Namespace::new(database, collection),
            documents: 0,
            payload: None,
            options: StoreOptions::default(),
        })?;
        let inner = self.inner.obtain_handle(database, collection).await?;
        Ok(Arc::new(RecordingStore {
            inner,
            recorder: Arc::clone(&self.recorder),
        }))
    }

    async fn close(&self) -> StoreResult<()> {
        self.inner.close().await
    }
}

/// A [`StoreHandle`] that records calls before forwarding them.
pub struct RecordingStore {
    inner: SharedHandle,
    recorder: Arc<Recorder>,
}

impl RecordingStore {
    fn call(&self, op: StoreOp, options: &StoreOptions) -> StoreCall {
        StoreCall {
            op,
            namespace: self.inner.namespace().clone(),
            documents: 0,
            payload: None,
            options: options.clone(),
        }
    }
}

#[async_trait]
impl StoreHandle for RecordingStore {
    fn namespace(&self) -> &Namespace {
        self.inner.namespace()
    }

    async fn insert(
        &self,
        docs: Vec<Document>,
        options: &StoreOptions,
    ) -> StoreResult<Vec<Document>> {
        self.recorder.record(StoreCall {
            documents: docs.len(),
            ..self.call(StoreOp::Insert, options)
        })?;
        self.inner.insert(docs, options).await
    }

    async fn update(
        &self,
        filter: &Filter,
        set: Document,
        options: &StoreOptions,
    ) -> StoreResult<UpdateOutcome> {
        self.recorder.record(StoreCall {
            payload: Some(set.clone()),
            ..self.call(StoreOp::Update, options)
        })?;
        self.inner.update(filter, set, options).await
    }

    async fn find(&self, filter: &Filter, options: &StoreOptions) -> StoreResult<Vec<Document>> {
        self.recorder.record(self.call(StoreOp::Find, options))?;
        self.inner.find(filter, options).await
    }

    async fn remove(&self, filter: &Filter, options: &StoreOptions) -> StoreResult<u64> {
        self.recorder.record(self.call(StoreOp::Remove, options))?;
        self.inner.remove(filter, options).await
    }
}
