//! Common error types for QuoteSync.

use thiserror::Error;

/// Top-level error type for QuoteSync operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed record or import document.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Remote fetch or publish failed.
    #[error("Network error: {0}")]
    Network(String),

    /// Persistence layer failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Sync scheduler is not running or dropped a request.
    #[error("Scheduler error: {0}")]
    Scheduler(String),
}

impl Error {
    /// Whether the error is transient and worth another attempt on the next tick.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
