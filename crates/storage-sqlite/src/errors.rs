//! Storage-level error type and its conversion into the core error.

use launchpad_core::errors::{DatabaseError, Error};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Connection retry budget exhausted; carries the last underlying error.
    #[error("database unreachable after {attempts} attempts: {source}")]
    ConnectionUnavailable {
        attempts: u32,
        #[source]
        source: rusqlite::Error,
    },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("unsupported table '{0}'")]
    UnsupportedTable(String),

    #[error("invalid column name '{0}'")]
    InvalidColumn(String),
}

impl From<StorageError> for Error {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::ConnectionUnavailable { attempts, source } => {
                Error::Database(DatabaseError::ConnectionUnavailable {
                    attempts,
                    message: source.to_string(),
                })
            }
            StorageError::Sqlite(err) => Error::Database(DatabaseError::Transient(err.to_string())),
            StorageError::UnsupportedTable(table) => Error::Database(DatabaseError::Internal(
                format!("unsupported table '{table}'"),
            )),
            StorageError::InvalidColumn(column) => Error::Database(DatabaseError::Internal(
                format!("invalid column name '{column}'"),
            )),
        }
    }
}
