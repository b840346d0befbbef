//! Document validation: path rules, addresses, content hash, signature and
//! expiry.

use crate::address::{AuthorAddress, WorkspaceAddress};
use crate::canonical::signing_bytes;
use crate::crypto::{content_hash, Ed25519Signature};
use crate::document::{Document, DOCUMENT_FORMAT};
use crate::error::ValidationError;

/// Smallest timestamp we accept, in microseconds (late 1970).
pub const MIN_TIMESTAMP: i64 = 10_000_000_000_000;
/// Largest timestamp we accept: 2^53 - 2, so values survive JSON numbers.
pub const MAX_TIMESTAMP: i64 = 9_007_199_254_740_990;
/// How far into the future a timestamp may be, in microseconds.
pub const FUTURE_CUTOFF_MICROS: i64 = 10 * 60 * 1_000_000;

const FORBIDDEN_PATH_CHARS: &[char] = &[
    ' ', '`', '?', '#', '"', '<', '>', '\\', '{', '}', '|', '^', '[', ']',
];

/// Current time in microseconds since the Unix epoch.
pub fn now_micros() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or(0)
}

/// Check a path against the path rules.
pub fn validate_path(path: &str) -> Result<(), ValidationError> {
    let invalid = |reason| ValidationError::InvalidPath {
        path: path.to_string(),
        reason,
    };

    if !path.starts_with('/') {
        return Err(invalid("must start with '/'"));
    }
    if path.len() > 1 && path.ends_with('/') {
        return Err(invalid("must not end with '/'"));
    }
    if path == "/" {
        return Err(invalid("must not be empty"));
    }
    if path.contains("//") {
        return Err(invalid("must not contain '//'"));
    }
    if path
        .chars()
        .any(|c| !c.is_ascii_graphic() || FORBIDDEN_PATH_CHARS.contains(&c))
    {
        return Err(invalid("contains a forbidden character"));
    }
    Ok(())
}

/// Full validation of a document destined for `workspace`.
///
/// This performs:
/// - Format check
/// - Workspace and author address checks
/// - Path rules, including the ephemeral `deleteAfter` pairing
/// - Timestamp range, future bound and expiry
/// - Content hash verification
/// - Signature verification
pub fn validate_document(
    doc: &Document,
    workspace: &WorkspaceAddress,
    now: i64,
) -> Result<(), ValidationError> {
    if doc.format != DOCUMENT_FORMAT {
        return Err(ValidationError::UnsupportedFormat(doc.format.clone()));
    }

    if doc.workspace != workspace.as_str() {
        return Err(ValidationError::WorkspaceMismatch {
            expected: workspace.to_string(),
            got: doc.workspace.clone(),
        });
    }

    let author = AuthorAddress::parse(&doc.author)?;

    validate_path(&doc.path)?;

    match (doc.is_ephemeral(), doc.delete_after) {
        (true, Some(delete_after)) => {
            if delete_after <= doc.timestamp {
                return Err(ValidationError::DeleteAfterBeforeTimestamp {
                    delete_after,
                    timestamp: doc.timestamp,
                });
            }
            if delete_after <= now {
                return Err(ValidationError::Expired(delete_after));
            }
        }
        (false, None) => {}
        _ => return Err(ValidationError::EphemeralMismatch),
    }

    if !(MIN_TIMESTAMP..=MAX_TIMESTAMP).contains(&doc.timestamp) {
        return Err(ValidationError::TimestampOutOfRange(doc.timestamp));
    }
    if doc.timestamp > now + FUTURE_CUTOFF_MICROS {
        return Err(ValidationError::TimestampInFuture {
            timestamp: doc.timestamp,
            now,
        });
    }

    if content_hash(&doc.content) != doc.content_hash {
        return Err(ValidationError::ContentHashMismatch);
    }

    let signature =
        Ed25519Signature::from_hex(&doc.signature).map_err(|_| ValidationError::SignatureFailed)?;
    let message = signing_bytes(doc)?;
    author.public_key()?.verify(&message, &signature)?;

    Ok(())
}
