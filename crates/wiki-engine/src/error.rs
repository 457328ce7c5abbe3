//! Engine error types.

use thiserror::Error;

/// Errors raised by a blob store backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Errors surfaced by engine operations.
///
/// Missing pages and out-of-range history indices are not errors: the former
/// are materialized, the latter turn the operation into a no-op.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Writing a blob failed. The in-memory state already reflects the
    /// operation and stays ahead of the durable copy until the next write.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// An import payload was rejected; nothing was modified.
    #[error("Invalid import: {0}")]
    InvalidImport(String),

    #[error("Page name must not be empty")]
    EmptyPageName,
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        Self::Storage(StorageError::Json(e))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
