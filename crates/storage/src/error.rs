//! Storage error types.

use ticktrack_core::EntryId;

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Entry not found
    #[error("Not found: {0}")]
    NotFound(EntryId),

    /// Mutation that needs a running entry
    #[error("Entry {0} is not running")]
    NotRunning(EntryId),
}
