//! Error types for the Node.

use pubsync_core::{CoreError, ValidationError};
use pubsync_store::StoreError;
use pubsync_sync::SyncError;
use thiserror::Error;

/// Errors that can occur during Node operations.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Address, key or encoding error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Validation error.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Sync error.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),
}

/// Result type for Node operations.
pub type Result<T> = std::result::Result<T, NodeError>;
