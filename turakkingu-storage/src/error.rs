//! Error types for the storage layer.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors a persistence backend can report.
///
/// None of these ever reach the embedding page: the adapter falls back to
/// the next backend or reports the value as absent.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend refused the write because it is full.
    #[error("storage quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The backend is disabled (private mode, blocked by policy).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
