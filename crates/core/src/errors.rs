//! Error types shared across the launchpad crates.

use thiserror::Error;

/// Result type alias used throughout the core and storage crates.
pub type Result<T> = std::result::Result<T, Error>;

/// Store-level failures surfaced by a storage backend.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The store could not be reached after exhausting the retry budget.
    #[error("database unreachable after {attempts} attempts: {message}")]
    ConnectionUnavailable { attempts: u32, message: String },

    /// A single operation failed; the next attempt may succeed.
    #[error("transient store failure: {0}")]
    Transient(String),

    #[error("database error: {0}")]
    Internal(String),
}

/// Top-level error for the launchpad core.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Caller supplied an incomplete record to an insert-style operation.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
