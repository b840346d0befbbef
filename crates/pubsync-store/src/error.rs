//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
///
/// Validation failures are not errors: they come back as
/// [`WriteResult::Rejected`](crate::WriteResult::Rejected). Anything here
/// means the store itself is unhealthy.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// The database file belongs to a different workspace.
    #[error("store holds workspace {found}, expected {expected}")]
    WorkspaceMismatch { expected: String, found: String },

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A lock was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    /// A blocking task failed to complete.
    #[error("blocking task failed: {0}")]
    Task(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
