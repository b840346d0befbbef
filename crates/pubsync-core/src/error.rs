//! Error types for pubsync core.

use thiserror::Error;

/// Core errors that can occur while building or signing documents.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid workspace address {address:?}: {reason}")]
    InvalidWorkspaceAddress { address: String, reason: String },

    #[error("invalid author address {address:?}: {reason}")]
    InvalidAuthorAddress { address: String, reason: String },

    #[error("invalid author shortname {0:?}")]
    InvalidShortname(String),

    #[error("encoding error: {0}")]
    EncodingError(String),
}

/// Reasons a document fails validation.
///
/// The `Display` text is what ends up as the rejection reason in ingestion
/// reports, so keep it readable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unsupported document format {0:?}")]
    UnsupportedFormat(String),

    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("invalid author: {0}")]
    InvalidAuthor(String),

    #[error("invalid workspace: {0}")]
    InvalidWorkspace(String),

    #[error("document belongs to workspace {got}, not {expected}")]
    WorkspaceMismatch { expected: String, got: String },

    #[error("content hash does not match content")]
    ContentHashMismatch,

    #[error("signature verification failed")]
    SignatureFailed,

    #[error("timestamp {0} is outside the valid range")]
    TimestampOutOfRange(i64),

    #[error("timestamp {timestamp} is too far in the future (now {now})")]
    TimestampInFuture { timestamp: i64, now: i64 },

    #[error("document expired at {0}")]
    Expired(i64),

    #[error("deleteAfter must be set on ephemeral paths and only on ephemeral paths")]
    EphemeralMismatch,

    #[error("deleteAfter {delete_after} is not after timestamp {timestamp}")]
    DeleteAfterBeforeTimestamp { delete_after: i64, timestamp: i64 },

    #[error("encoding error: {0}")]
    Encoding(String),
}

impl From<CoreError> for ValidationError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidSignature | CoreError::InvalidPublicKey => {
                ValidationError::SignatureFailed
            }
            CoreError::InvalidWorkspaceAddress { reason, .. } => {
                ValidationError::InvalidWorkspace(reason)
            }
            CoreError::InvalidAuthorAddress { reason, .. } => ValidationError::InvalidAuthor(reason),
            CoreError::InvalidShortname(name) => {
                ValidationError::InvalidAuthor(format!("bad shortname {:?}", name))
            }
            CoreError::EncodingError(msg) => ValidationError::Encoding(msg),
        }
    }
}
