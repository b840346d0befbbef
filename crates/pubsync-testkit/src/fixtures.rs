//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::{Arc, Once};

use pubsync::{Node, NodeConfig};
use pubsync_core::{now_micros, AuthorKeypair, Document, DocumentBuilder, WorkspaceAddress};
use pubsync_store::{DocumentStore, MemoryStore, WriteResult};
use pubsync_sync::MemoryNetwork;

/// Workspace used by fixtures unless told otherwise.
pub const TEST_WORKSPACE: &str = "+test.abc";

/// A test fixture with an author, a workspace and a memory store.
pub struct TestFixture {
    pub author: AuthorKeypair,
    pub workspace: WorkspaceAddress,
    pub store: Arc<MemoryStore>,
}

impl TestFixture {
    /// Create a new test fixture with a random author.
    pub fn new() -> Self {
        let author = AuthorKeypair::generate("test").expect("valid shortname");
        Self::with_author(author)
    }

    /// Create with a deterministic author from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self::with_author(author_from_seed("test", seed))
    }

    pub fn with_author(author: AuthorKeypair) -> Self {
        let workspace = test_workspace();
        Self {
            author,
            store: Arc::new(MemoryStore::new(workspace.clone())),
            workspace,
        }
    }

    /// Author address as it appears in documents.
    pub fn author_address(&self) -> String {
        self.author.address().to_string()
    }

    /// A document written now.
    pub fn make_doc(&self, path: &str, content: &str) -> Document {
        self.make_doc_at(path, content, now_micros())
    }

    /// A document with an explicit timestamp.
    pub fn make_doc_at(&self, path: &str, content: &str, timestamp: i64) -> Document {
        DocumentBuilder::new(self.workspace.clone(), path)
            .content(content)
            .timestamp(timestamp)
            .sign(&self.author)
            .expect("signing a fixture document")
    }

    /// A tombstone written now.
    pub fn make_tombstone(&self, path: &str) -> Document {
        self.make_doc(path, "")
    }

    /// An ephemeral document expiring `ttl_micros` from now.
    pub fn make_ephemeral(&self, path: &str, content: &str, ttl_micros: i64) -> Document {
        let now = now_micros();
        DocumentBuilder::new(self.workspace.clone(), path)
            .content(content)
            .timestamp(now)
            .delete_after(now + ttl_micros)
            .sign(&self.author)
            .expect("signing a fixture document")
    }

    /// Write a document, panicking unless it is accepted.
    pub async fn write(&self, doc: &Document) {
        let result = self.store.write(doc).await.expect("store write");
        assert_eq!(result, WriteResult::Accepted, "fixture write for {}", doc.path);
    }

    /// Write one document per `(path, content)` pair and return them.
    pub async fn seed(&self, entries: &[(&str, &str)]) -> Vec<Document> {
        let mut docs = Vec::with_capacity(entries.len());
        for (path, content) in entries {
            let doc = self.make_doc(path, content);
            self.write(&doc).await;
            docs.push(doc);
        }
        docs
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create multiple deterministic authors for multi-party tests.
pub fn multi_party_authors(count: usize) -> Vec<AuthorKeypair> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            author_from_seed(&format!("p{:03}", i % 1000), seed)
        })
        .collect()
}

/// A deterministic author.
pub fn author_from_seed(shortname: &str, seed: [u8; 32]) -> AuthorKeypair {
    AuthorKeypair::from_seed(shortname, &seed).expect("valid shortname")
}

pub fn test_workspace() -> WorkspaceAddress {
    WorkspaceAddress::parse(TEST_WORKSPACE).expect("valid workspace address")
}

/// An in-process network of nodes.
///
/// Nodes created here reach each other through the network's connector;
/// a node is reachable once it is served at a URL.
pub struct TestNetwork {
    pub network: Arc<MemoryNetwork>,
}

impl TestNetwork {
    pub fn new() -> Self {
        Self {
            network: MemoryNetwork::new(),
        }
    }

    /// A node with in-memory storage and default config.
    pub async fn node(&self) -> Node {
        self.node_with(NodeConfig::default()).await
    }

    pub async fn node_with(&self, config: NodeConfig) -> Node {
        Node::new(config, Arc::new(self.network.connector()))
            .await
            .expect("node startup")
    }

    /// Answer Rich requests at `url` with `node`'s workspaces.
    pub async fn serve(&self, url: &str, node: &Node) {
        self.network.add_peer(url, node.service()).await;
    }

    /// Answer Legacy requests at `url` with `node`'s workspaces.
    pub async fn serve_legacy(&self, url: &str, node: &Node) {
        self.network.add_legacy_peer(url, node.service()).await;
    }

    /// Requests routed so far, including ones to unknown URLs.
    pub fn request_count(&self) -> usize {
        self.network.request_count()
    }
}

impl Default for TestNetwork {
    fn default() -> Self {
        Self::new()
    }
}

/// Send `tracing` output to the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubsync_core::{validate_document, SyncFilters};

    #[tokio::test]
    async fn test_fixture_documents_validate() {
        let fixture = TestFixture::new();
        let now = now_micros();

        for doc in [
            fixture.make_doc("/a", "hello"),
            fixture.make_tombstone("/b"),
            fixture.make_ephemeral("/c!", "soon gone", 60_000_000),
        ] {
            assert!(validate_document(&doc, &fixture.workspace, now).is_ok());
        }
    }

    #[tokio::test]
    async fn test_seed_writes_everything() {
        let fixture = TestFixture::with_seed([3; 32]);
        fixture.seed(&[("/x/1", "a"), ("/y/1", "b")]).await;

        let docs = fixture
            .store
            .query(&SyncFilters::unfiltered(), false)
            .await
            .unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().all(|d| d.author == fixture.author_address()));
    }

    #[tokio::test]
    async fn test_multi_party() {
        let authors = multi_party_authors(3);

        // Each party has unique keys
        let addresses: Vec<_> = authors.iter().map(|a| a.address().clone()).collect();
        assert_ne!(addresses[0], addresses[1]);
        assert_ne!(addresses[1], addresses[2]);
        assert_ne!(addresses[0], addresses[2]);
    }

    #[tokio::test]
    async fn test_network_serves_node() {
        let net = TestNetwork::new();
        let remote = net.node().await;
        remote.add_workspace(TEST_WORKSPACE, None).await.unwrap();
        net.serve("mem://remote", &remote).await;

        let local = net.node().await;
        let outcome = local.sync_with_peer(TEST_WORKSPACE, "mem://remote").await;
        assert!(outcome.is_success(), "{:?}", outcome);
        assert!(net.request_count() > 0);
    }
}
