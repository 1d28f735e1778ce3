//! Error types for store operations.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors reported by a store handle or connection provider.
///
/// These are surfaced to callers exactly as the store produced them, so each
/// variant mirrors an error kind a document store driver can report.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// An update tried to modify the identity field of an existing document.
    #[error("Mod on {field} not allowed")]
    IdentityMutation {
        /// The identity field name.
        field: String,
    },

    /// An insert used an identity that is already taken.
    #[error("E11000 duplicate key error: {namespace}.{field} dup key: {value}")]
    DuplicateKey {
        /// Namespace the insert targeted.
        namespace: String,
        /// The identity field name.
        field: String,
        /// Rendered identity value.
        value: String,
    },

    /// The store could not be reached.
    #[error("connection error: {0}")]
    Connection(String),

    /// The operation did not complete in time.
    #[error("operation timed out after {millis}ms")]
    Timeout {
        /// Elapsed milliseconds before giving up.
        millis: u64,
    },

    /// The store or its provider has been closed.
    #[error("store is closed")]
    Closed,

    /// Any other error reported by the driver.
    #[error("driver error {code}: {message}")]
    Driver {
        /// Driver error code.
        code: i32,
        /// Driver error message.
        message: String,
    },
}

impl StoreError {
    /// Creates an identity mutation error for `field`.
    pub fn identity_mutation(field: impl Into<String>) -> Self {
        Self::IdentityMutation {
            field: field.into(),
        }
    }

    /// Creates a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Creates a driver error.
    pub fn driver(code: i32, message: impl Into<String>) -> Self {
        Self::Driver {
            code,
            message: message.into(),
        }
    }

    /// Returns the driver-style numeric code for this error, if it has one.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::IdentityMutation { .. } => Some(10148),
            Self::DuplicateKey { .. } => Some(11000),
            Self::Timeout { .. } => Some(50),
            Self::Driver { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_mutation_message() {
        let err = StoreError::identity_mutation("_id");
        assert_eq!(err.to_string(), "Mod on _id not allowed");
        assert_eq!(err.code(), Some(10148));
    }

    #[test]
    fn codes() {
        assert_eq!(StoreError::driver(13, "unauthorized").code(), Some(13));
        assert_eq!(StoreError::Closed.code(), None);
        assert_eq!(StoreError::connection("refused").code(), None);
    }

    #[test]
    fn duplicate_key_names_the_namespace() {
        let err = StoreError::DuplicateKey {
            namespace: "app.users".into(),
            field: "_id".into(),
            value: "1".into(),
        };
        assert!(err.to_string().contains("app.users._id"));
        assert_eq!(err.code(), Some(11000));
    }
}
