//! Domain-level error types.

use thiserror::Error;

/// Document store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record already exists: {collection}/{id}")]
    Conflict { collection: String, id: String },

    #[error("Store I/O failed: {0}")]
    Io(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// File storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Rejected names end up here too, so callers can't tell them apart
    /// from missing files.
    #[error("File not found")]
    NotFound,

    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
