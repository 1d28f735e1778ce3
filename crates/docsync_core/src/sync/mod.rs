//! Entity synchronization: options, outputs and the dispatch pipeline.
//!
//! One sync call runs strictly in order: verb resolution, destination
//! resolution, the validation gate, before-hooks, embedded children, the store
//! operation, the state transition, then after-hooks.

mod dispatch;
mod persist;

pub(crate) use dispatch::Prepared;

use crate::types::Verb;
use docsync_document::{Document, Value};
use docsync_store::StoreOptions;

/// Options for one sync call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Whether to run the validation gate. `None` uses the engine default.
    pub validate: Option<bool>,
    /// Turn an update into a patch of the changed attributes.
    pub patch: bool,
    /// Options passed to the store untouched.
    pub store: StoreOptions,
}

impl SyncOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether the validation gate runs.
    #[must_use]
    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = Some(validate);
        self
    }

    /// Skips the validation gate.
    #[must_use]
    pub fn skip_validation(self) -> Self {
        self.validate(false)
    }

    /// Sends only changed attributes when updating.
    #[must_use]
    pub fn patch(mut self) -> Self {
        self.patch = true;
        self
    }

    /// Lets an update insert the document when nothing matches.
    #[must_use]
    pub fn upsert(mut self) -> Self {
        self.store.upsert = true;
        self
    }

    /// Restricts a read to the listed fields.
    #[must_use]
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.store = self.store.fields(fields);
        self
    }

    /// Limits how many documents a read returns.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.store = self.store.limit(limit);
        self
    }

    /// Adds a driver flag passed through to the store.
    #[must_use]
    pub fn driver_flag(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.store = self.store.flag(key, value);
        self
    }

    /// Options for syncing an embedded child: validation and driver flags
    /// carry over, per-call store settings do not.
    pub(crate) fn for_child(&self) -> Self {
        Self {
            validate: self.validate,
            patch: false,
            store: StoreOptions {
                extra: self.store.extra.clone(),
                ..StoreOptions::default()
            },
        }
    }
}

/// What a sync call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutput {
    /// The documents the store inserted.
    Created(Vec<Document>),
    /// An update or patch completed.
    Updated {
        /// Documents written, counting an upsert as one.
        modified: u64,
        /// The entity's document after the write.
        document: Document,
    },
    /// The stored document, if one was found.
    Read(Option<Document>),
    /// Number of documents removed.
    Deleted(u64),
}

impl SyncOutput {
    /// The verb family that produced this output.
    pub fn verb(&self) -> Verb {
        match self {
            SyncOutput::Created(_) => Verb::Create,
            SyncOutput::Updated { .. } => Verb::Update,
            SyncOutput::Read(_) => Verb::Read,
            SyncOutput::Deleted(_) => Verb::Delete,
        }
    }

    /// The inserted documents of a create.
    pub fn created(&self) -> Option<&[Document]> {
        match self {
            SyncOutput::Created(docs) => Some(docs),
            _ => None,
        }
    }

    /// The write count of an update.
    pub fn modified(&self) -> Option<u64> {
        match self {
            SyncOutput::Updated { modified, .. } => Some(*modified),
            _ => None,
        }
    }

    /// The document of a read, if found.
    pub fn read(&self) -> Option<&Document> {
        match self {
            SyncOutput::Read(doc) => doc.as_ref(),
            _ => None,
        }
    }

    /// The removal count of a delete.
    pub fn deleted(&self) -> Option<u64> {
        match self {
            SyncOutput::Deleted(n) => Some(*n),
            _ => None,
        }
    }

    /// The single document this output describes, if any.
    pub fn document(&self) -> Option<&Document> {
        match self {
            SyncOutput::Created(docs) => docs.first(),
            SyncOutput::Updated { document, .. } => Some(document),
            SyncOutput::Read(doc) => doc.as_ref(),
            SyncOutput::Deleted(_) => None,
        }
    }
}
