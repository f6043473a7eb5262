//! Error types for the storage engine.

use thiserror::Error;

/// Storage engine error type.
#[derive(Debug, Error)]
pub enum StorageError {
    /// `SQLite` storage error (sync).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// `SQLite` storage error (async).
    #[error("tokio-rusqlite error: {0}")]
    TokioSqlite(#[from] tokio_rusqlite::Error),
    /// A persisted row could not be mapped back to a domain type.
    #[error("invalid row data: {0}")]
    InvalidRow(String),
    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
