//! Error types for docsync core.

use crate::sync::SyncOutput;
use crate::types::{HookPhase, HookPoint};
use docsync_store::StoreError;
use std::fmt;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Error type hook handlers report through their continuation.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// A rejection returned by a schema's validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    /// Creates a validation error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the message the validator gave.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

impl From<&str> for ValidationError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ValidationError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Errors that can occur in docsync core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The destination could not be resolved. Raised before any store contact.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of what is missing.
        message: String,
    },

    /// The validator rejected the entity.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A before-hook reported an error.
    #[error("{phase}:{point} hook on '{attribute}' failed: {source}")]
    Hook {
        /// Phase of the failing hook.
        phase: HookPhase,
        /// Point of the failing hook.
        point: HookPoint,
        /// Attribute the hook is registered for.
        attribute: String,
        /// Error the handler reported.
        source: HookError,
    },

    /// The store reported an error. Passed through unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An embedded entity failed to sync. The parent write still happened.
    #[error("embedded entity '{attribute}' failed to sync: {source}")]
    Embedded {
        /// Attribute holding the failing child.
        attribute: String,
        /// The child's error.
        source: Box<CoreError>,
        /// What the parent's own write produced, when it got that far.
        output: Option<Box<SyncOutput>>,
    },

    /// An entity was embedded under an attribute the schema does not declare.
    #[error("attribute '{attribute}' is not embeddable in schema '{schema}'")]
    NotEmbeddable {
        /// Schema name.
        schema: String,
        /// Attribute name.
        attribute: String,
    },
}

impl CoreError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a hook error.
    pub fn hook(
        phase: HookPhase,
        point: HookPoint,
        attribute: impl Into<String>,
        source: HookError,
    ) -> Self {
        Self::Hook {
            phase,
            point,
            attribute: attribute.into(),
            source,
        }
    }

    /// Creates an embedded failure error.
    pub fn embedded(attribute: impl Into<String>, source: CoreError) -> Self {
        Self::Embedded {
            attribute: attribute.into(),
            source: Box::new(source),
            output: None,
        }
    }

    /// Attaches the parent's own result to an embedded failure. Other
    /// errors are returned unchanged.
    #[must_use]
    pub fn with_parent_output(self, parent: SyncOutput) -> Self {
        match self {
            Self::Embedded {
                attribute, source, ..
            } => Self::Embedded {
                attribute,
                source,
                output: Some(Box::new(parent)),
            },
            other => other,
        }
    }

    /// Returns what the parent write produced, for an embedded failure.
    pub fn parent_output(&self) -> Option<&SyncOutput> {
        match self {
            Self::Embedded { output, .. } => output.as_deref(),
            _ => None,
        }
    }

    /// Returns the store error, if the store reported this failure.
    pub fn as_store(&self) -> Option<&StoreError> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }

    /// Returns the validation error, if the validator rejected the entity.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }

    /// Returns true for configuration errors.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}
