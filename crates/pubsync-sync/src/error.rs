//! Error types for the sync module.

use thiserror::Error;

/// Errors that can occur during sync operations.
///
/// These end the current session only. The orchestrator turns them into a
/// [`SyncOutcome::Error`](crate::SyncOutcome::Error) for the peer concerned.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The peer could not be reached or the request failed in transit.
    #[error("network error: {0}")]
    Network(String),

    /// The peer answered with something we did not expect.
    #[error("protocol mismatch: {0}")]
    ProtocolMismatch(String),

    /// A network phase took longer than the configured timeout.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] pubsync_store::StoreError),

    /// Sync was cancelled.
    #[error("sync cancelled")]
    Cancelled,
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
