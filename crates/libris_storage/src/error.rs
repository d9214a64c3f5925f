//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The named table has never been written.
    #[error("table not found: {name}")]
    TableNotFound {
        /// The requested table name.
        name: String,
    },

    /// The table name contains characters that are not allowed.
    #[error("invalid table name: {name:?}")]
    InvalidTableName {
        /// The rejected table name.
        name: String,
    },

    /// The backend refuses writes.
    #[error("storage is read-only")]
    ReadOnly,
}
