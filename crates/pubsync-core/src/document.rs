//! Documents: the unit of replication.
//!
//! A document is one author's version of one path inside a workspace. The
//! store keeps at most one version per `(path, author)`, the one with the
//! highest timestamp. An empty `content` marks a tombstone.

use serde::{Deserialize, Serialize};

use crate::address::WorkspaceAddress;
use crate::canonical::signing_bytes;
use crate::crypto::{content_hash, AuthorKeypair};
use crate::error::CoreError;

/// Format tag written on every document this crate creates.
pub const DOCUMENT_FORMAT: &str = "es.4";

/// A signed, versioned document.
///
/// Address-like fields are kept as plain strings so that malformed documents
/// from peers can still be decoded and then rejected by validation, instead
/// of failing the whole batch at the wire layer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub format: String,
    pub workspace: String,
    pub path: String,
    pub author: String,
    pub content: String,
    pub content_hash: String,
    /// Microseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_after: Option<i64>,
    pub signature: String,
}

impl Document {
    /// Empty content means the author deleted the document.
    pub fn is_tombstone(&self) -> bool {
        self.content.is_empty()
    }

    /// Ephemeral paths contain `!` and carry an expiry.
    pub fn is_ephemeral(&self) -> bool {
        self.path.contains('!')
    }

    /// True if this is the exact same version as `other`.
    pub fn same_version(&self, other: &Document) -> bool {
        self.path == other.path
            && self.author == other.author
            && self.timestamp == other.timestamp
            && self.signature == other.signature
    }

    /// Whether `now` is past this document's expiry.
    pub fn is_expired(&self, now: i64) -> bool {
        matches!(self.delete_after, Some(t) if t <= now)
    }
}

/// Builder for creating new signed documents.
pub struct DocumentBuilder {
    workspace: WorkspaceAddress,
    path: String,
    content: String,
    timestamp: i64,
    delete_after: Option<i64>,
}

impl DocumentBuilder {
    pub fn new(workspace: WorkspaceAddress, path: impl Into<String>) -> Self {
        Self {
            workspace,
            path: path.into(),
            content: String::new(),
            timestamp: 0,
            delete_after: None,
        }
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Set the timestamp (microseconds).
    pub fn timestamp(mut self, ts: i64) -> Self {
        self.timestamp = ts;
        self
    }

    pub fn delete_after(mut self, ts: i64) -> Self {
        self.delete_after = Some(ts);
        self
    }

    /// Sign the document. Does not validate the path; validation is the
    /// store's job.
    pub fn sign(self, author: &AuthorKeypair) -> Result<Document, CoreError> {
        let mut doc = Document {
            format: DOCUMENT_FORMAT.to_string(),
            workspace: self.workspace.into(),
            path: self.path,
            author: author.address().to_string(),
            content_hash: content_hash(&self.content),
            content: self.content,
            timestamp: self.timestamp,
            delete_after: self.delete_after,
            signature: String::new(),
        };
        let message = signing_bytes(&doc)?;
        doc.signature = author.sign(&message).to_hex();
        Ok(doc)
    }
}
