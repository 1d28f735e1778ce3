//! Namespaces, filters and per-call store options.

use docsync_document::{Document, Value};
use std::fmt;

/// A database and collection pair naming where documents live.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace {
    /// Database name.
    pub database: String,
    /// Collection name.
    pub collection: String,
}

impl Namespace {
    /// Creates a namespace.
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// A conjunction of attribute equality clauses.
///
/// An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    clauses: Document,
}

impl Filter {
    /// A filter matching every document.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// A filter matching documents whose `key` equals `value`.
    pub fn eq(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and(key, value)
    }

    /// Adds another equality clause.
    #[must_use]
    pub fn and(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.insert(key, value);
        self
    }

    /// Returns the clauses as a document.
    pub fn clauses(&self) -> &Document {
        &self.clauses
    }

    /// Returns the value a clause requires for `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.clauses.get(key)
    }

    /// Returns true if this filter has no clauses.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Returns true if `doc` satisfies every clause.
    pub fn matches(&self, doc: &Document) -> bool {
        self.clauses.iter().all(|(k, v)| doc.get(k) == Some(v))
    }
}

impl From<Document> for Filter {
    fn from(clauses: Document) -> Self {
        Self { clauses }
    }
}

/// Options passed through to a store call.
///
/// `extra` carries driver-specific flags the engine does not interpret.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreOptions {
    /// Insert a new document when an update matches nothing.
    pub upsert: bool,
    /// Fields to return from a find. The identity field is always returned.
    pub fields: Option<Vec<String>>,
    /// Maximum number of documents a find returns.
    pub limit: Option<usize>,
    /// Driver flags passed through untouched.
    pub extra: Document,
}

impl StoreOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the upsert flag.
    #[must_use]
    pub fn upsert(mut self, upsert: bool) -> Self {
        self.upsert = upsert;
        self
    }

    /// Restricts a find to the listed fields.
    #[must_use]
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Limits the number of documents a find returns.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Adds a driver flag.
    #[must_use]
    pub fn flag(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key, value);
        self
    }
}

/// Result of an update call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Documents that matched the filter.
    pub matched: u64,
    /// Documents that were changed.
    pub modified: u64,
    /// Identity of the document inserted by an upsert.
    pub upserted: Option<Value>,
}

impl UpdateOutcome {
    /// Returns the number of documents written, counting an upsert as one.
    pub fn written(&self) -> u64 {
        self.modified + u64::from(self.upserted.is_some())
    }
}
