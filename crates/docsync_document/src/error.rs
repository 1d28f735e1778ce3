//! Error types for the document crate.

use thiserror::Error;

/// Result type for document value operations.
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Errors raised while converting into document values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// A string could not be parsed as an ObjectId.
    #[error("invalid ObjectId: {input:?}")]
    InvalidObjectId {
        /// The rejected input.
        input: String,
    },
}

impl DocumentError {
    /// Create an invalid ObjectId error.
    pub fn invalid_object_id(input: impl Into<String>) -> Self {
        Self::InvalidObjectId {
            input: input.into(),
        }
    }
}
