//! DocumentStore trait: the abstract interface for one workspace's documents.
//!
//! This trait allows the sync engine to be storage-agnostic. Implementations
//! include SQLite (persistent) and in-memory (tests, embedding).

use async_trait::async_trait;
use pubsync_core::{Document, SyncFilters, WorkspaceAddress};

use crate::error::Result;

/// Result of writing a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// The document is now the stored version for its `(path, author)`.
    Accepted,
    /// An equal-or-newer version already exists for `(path, author)`.
    Ignored,
    /// The document failed validation.
    Rejected { reason: String },
}

/// The DocumentStore trait: async interface for a single workspace replica.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
///
/// # Design Notes
///
/// - **One version per author**: the store keeps at most one version per
///   `(path, author)`, the one with the highest timestamp.
/// - **Write-if-newer**: writing an equal-or-older version is `Ignored`.
/// - **Validation on write**: every write is validated against the store's
///   workspace address and the current time.
/// - **Expired documents** (ephemeral documents past `deleteAfter`) are never
///   returned from reads.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// The workspace this store holds.
    fn address(&self) -> &WorkspaceAddress;

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Validate and write a document if it is newer than the stored version
    /// for its `(path, author)`.
    async fn write(&self, doc: &Document) -> Result<WriteResult>;

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// All stored versions matching `filters`, ordered by path then author.
    ///
    /// Empty filters select everything. Tombstones are skipped unless
    /// `include_deleted` is set.
    async fn query(&self, filters: &SyncFilters, include_deleted: bool) -> Result<Vec<Document>>;

    /// The canonical document at `path`: the newest version across authors.
    async fn get(&self, path: &str) -> Result<Option<Document>>;

    /// The stored version of `path` by `author`, if any.
    async fn get_by_author(&self, path: &str, author: &str) -> Result<Option<Document>>;

    /// Distinct authors with at least one stored version, sorted.
    async fn authors(&self) -> Result<Vec<String>>;

    /// Every stored version, tombstones included.
    async fn documents(&self) -> Result<Vec<Document>> {
        self.query(&SyncFilters::unfiltered(), true).await
    }
}

/// Pick the canonical version among several authors' versions of one path.
///
/// Highest timestamp wins; ties go to the larger signature so every replica
/// agrees.
pub(crate) fn newest<'a, I>(versions: I) -> Option<&'a Document>
where
    I: IntoIterator<Item = &'a Document>,
{
    versions.into_iter().max_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.signature.cmp(&b.signature))
    })
}
