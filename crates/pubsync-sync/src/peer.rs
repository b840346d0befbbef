//! Peer abstraction: one client trait for both wire dialects.

use std::fmt;

use async_trait::async_trait;

use pubsync_core::{Document, SyncFilters, WorkspaceAddress};

use crate::error::Result;
use crate::messages::{IngestReply, PullReply};

/// Wire dialect a peer speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Negotiates filters and reports per-document ingestion results.
    Rich,
    /// Serves every document unconditionally and reports success only.
    Legacy,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Rich => f.write_str("rich"),
            Protocol::Legacy => f.write_str("legacy"),
        }
    }
}

/// A connection to one peer, already bound to a dialect.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait PeerClient: Send + Sync {
    fn url(&self) -> &str;

    fn protocol(&self) -> Protocol;

    /// Fetch the peer's declared filters and its documents matching `filters`.
    ///
    /// Legacy clients ignore `filters`, return every document and report no
    /// declared filters.
    async fn pull(&self, workspace: &WorkspaceAddress, filters: &SyncFilters) -> Result<PullReply>;

    /// Hand documents to the peer for ingestion.
    async fn push(&self, workspace: &WorkspaceAddress, documents: &[Document])
        -> Result<IngestReply>;
}

/// Opens peer clients by URL.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Minimal introspection request. `Ok` means the peer speaks Rich.
    async fn probe(&self, url: &str) -> Result<()>;

    /// Open a client for `url` speaking `protocol`.
    fn open(&self, url: &str, protocol: Protocol) -> Result<Box<dyn PeerClient>>;
}
