//! Error types for ngm-core.

use thiserror::Error;

/// Result type alias using ngm-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during memory operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A node field failed range or shape validation
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Embedding length does not match the configured dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    /// Snapshot could not be written or restored
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The vector index rejected an operation
    #[error("Vector index error: {0}")]
    Index(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A multi-step mutation failed partway and could not be undone
    #[error("Inconsistent state: {0}")]
    Inconsistency(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a dimension mismatch error.
    pub fn dimension(expected: usize, actual: usize) -> Self {
        Self::Dimension { expected, actual }
    }

    /// Create a persistence error.
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    /// Create a vector index error.
    pub fn index(err: impl std::fmt::Display) -> Self {
        Self::Index(err.to_string())
    }

    /// Whether the error was raised before any state was touched.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::Dimension { .. } | Self::Config(_)
        )
    }
}
