//! The Node: unified API for pubsync.
//!
//! A Node owns the set of workspaces this process holds and brings together
//! storage, local writes, peer-facing ingestion and sync.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use pubsync_core::{
    now_micros, AuthorAddress, AuthorKeypair, Document, DocumentBuilder, SyncFilters,
    WorkspaceAddress,
};
use pubsync_store::{DocumentStore, WriteResult};
use pubsync_sync::{
    AbortHandle, AllowAll, Connector, IngestionReport, MemoryProvisioner, Orchestrator,
    PeerService, Provisioner, SqliteProvisioner, StoreHandle, SyncConfig, SyncEntry, SyncOutcome,
    WorkspacePolicy, WorkspaceRegistry, WorkspaceSyncResult,
};

use crate::error::Result;

/// Where workspace stores live.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StorageMode {
    /// Fresh in-memory stores, lost on drop.
    #[default]
    Memory,
    /// One SQLite file per workspace under `dir`.
    Sqlite { dir: PathBuf },
}

/// Configuration for the Node.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    /// Backing storage for workspaces.
    pub storage: StorageMode,
    /// Sync configuration.
    pub sync: SyncConfig,
    /// Filters declared to peers: what this node wants to receive.
    pub sync_filters: SyncFilters,
    /// Workspaces opened at startup.
    pub workspaces: Vec<WorkspaceAddress>,
}

impl NodeConfig {
    pub fn with_storage(mut self, storage: StorageMode) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_sync(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }

    pub fn with_sync_filters(mut self, filters: SyncFilters) -> Self {
        self.sync_filters = filters;
        self
    }

    pub fn with_workspace(mut self, address: WorkspaceAddress) -> Self {
        self.workspaces.push(address);
        self
    }

    fn provisioner(&self) -> Arc<dyn Provisioner> {
        match &self.storage {
            StorageMode::Memory => Arc::new(MemoryProvisioner),
            StorageMode::Sqlite { dir } => Arc::new(SqliteProvisioner::new(dir.clone())),
        }
    }
}

/// Result of adding a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddWorkspaceResult {
    Added,
    /// Already held; nothing changed.
    Exists,
    /// Refused by policy (`None`) or not a valid address (`Some(reason)`).
    NotPermitted(Option<String>),
}

/// Result of removing a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveWorkspaceResult {
    Removed,
    NotPermitted(String),
}

/// A document to be written by a local author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub path: String,
    pub content: String,
    pub delete_after: Option<i64>,
}

impl NewDocument {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            delete_after: None,
        }
    }

    /// A tombstone for `path`.
    pub fn tombstone(path: impl Into<String>) -> Self {
        Self::new(path, "")
    }

    /// Expire the document at `delete_after` (microseconds). The path must
    /// contain `!`.
    pub fn ephemeral(mut self, delete_after: i64) -> Self {
        self.delete_after = Some(delete_after);
        self
    }
}

/// Result of a local write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetResult {
    /// Signed and stored.
    Set(Document),
    /// Signed but refused by the store.
    Rejected(String),
    WorkspaceNotFound,
}

/// Result of ingesting documents pushed by a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestDocumentsResult {
    Report(IngestionReport),
    WorkspaceNotFound,
}

/// The main Node struct.
///
/// Provides a unified API for:
/// - Adding and removing workspaces
/// - Writing documents as a local author
/// - Ingesting documents pushed by peers
/// - Syncing workspaces with remote peers
pub struct Node {
    /// Workspaces this node holds.
    registry: Arc<WorkspaceRegistry>,
    /// Creates stores for new workspaces.
    provisioner: Arc<dyn Provisioner>,
    /// Who may add or remove workspaces.
    policy: Arc<dyn WorkspacePolicy>,
    /// Runs sync sessions.
    orchestrator: Orchestrator,
    /// Configuration.
    config: NodeConfig,
}

impl Node {
    /// Create a node that allows adding any workspace.
    pub async fn new(config: NodeConfig, connector: Arc<dyn Connector>) -> Result<Self> {
        Self::with_policy(config, connector, Arc::new(AllowAll)).await
    }

    /// Create a node with a workspace policy.
    ///
    /// Opens every workspace listed in the config, bypassing the policy.
    pub async fn with_policy(
        config: NodeConfig,
        connector: Arc<dyn Connector>,
        policy: Arc<dyn WorkspacePolicy>,
    ) -> Result<Self> {
        let registry = Arc::new(WorkspaceRegistry::new());
        let provisioner = config.provisioner();

        for address in &config.workspaces {
            let store = provisioner.create_or_open(address).await?;
            registry.register(store).await;
            debug!(workspace = %address, "opened configured workspace");
        }

        let orchestrator = Orchestrator::new(
            registry.clone(),
            provisioner.clone(),
            policy.clone(),
            connector,
        )
        .with_filters(config.sync_filters.clone())
        .with_config(config.sync.clone());

        info!(
            workspaces = config.workspaces.len(),
            storage = ?config.storage,
            "node started"
        );

        Ok(Self {
            registry,
            provisioner,
            policy,
            orchestrator,
            config,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Workspace Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a workspace, creating its store.
    pub async fn add_workspace(
        &self,
        address: &str,
        author: Option<&AuthorAddress>,
    ) -> Result<AddWorkspaceResult> {
        let address = match WorkspaceAddress::parse(address) {
            Ok(address) => address,
            Err(e) => return Ok(AddWorkspaceResult::NotPermitted(Some(e.to_string()))),
        };

        if self.registry.contains(&address).await {
            return Ok(AddWorkspaceResult::Exists);
        }

        if !self.policy.can_add(&address, author) {
            info!(workspace = %address, "not permitted to add workspace");
            return Ok(AddWorkspaceResult::NotPermitted(None));
        }

        let (store, fresh) = self
            .registry
            .provision(&address, self.provisioner.as_ref())
            .await?;
        if !fresh {
            return Ok(AddWorkspaceResult::Exists);
        }
        self.registry.register(store).await;
        info!(workspace = %address, "added workspace");
        Ok(AddWorkspaceResult::Added)
    }

    /// Stop holding a workspace. Persistent storage is left in place.
    pub async fn remove_workspace(
        &self,
        address: &str,
        author: Option<&AuthorAddress>,
    ) -> Result<RemoveWorkspaceResult> {
        let address = match WorkspaceAddress::parse(address) {
            Ok(address) => address,
            Err(e) => return Ok(RemoveWorkspaceResult::NotPermitted(e.to_string())),
        };

        if !self.registry.contains(&address).await {
            return Ok(RemoveWorkspaceResult::NotPermitted(format!(
                "workspace {} is not held here",
                address
            )));
        }

        if !self.policy.can_remove(&address, author) {
            return Ok(RemoveWorkspaceResult::NotPermitted(format!(
                "not permitted to remove workspace {}",
                address
            )));
        }

        self.registry.remove(&address).await;
        info!(workspace = %address, "removed workspace");
        Ok(RemoveWorkspaceResult::Removed)
    }

    /// The store for a held workspace.
    pub async fn workspace(&self, address: &str) -> Option<StoreHandle> {
        self.registry.get_str(address).await
    }

    /// Every held workspace, sorted.
    pub async fn workspaces(&self) -> Vec<WorkspaceAddress> {
        self.registry.addresses().await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Document Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Sign and write a document as `author`.
    ///
    /// The timestamp is the current time, bumped past the newest version at
    /// the path so the new document wins.
    pub async fn set(
        &self,
        workspace: &str,
        author: &AuthorKeypair,
        document: NewDocument,
    ) -> Result<SetResult> {
        let Some(store) = self.registry.get_str(workspace).await else {
            return Ok(SetResult::WorkspaceNotFound);
        };

        let now = now_micros();
        let timestamp = match store.get(&document.path).await? {
            Some(current) => now.max(current.timestamp + 1),
            None => now,
        };

        let mut builder = DocumentBuilder::new(store.address().clone(), document.path)
            .content(document.content)
            .timestamp(timestamp);
        if let Some(delete_after) = document.delete_after {
            builder = builder.delete_after(delete_after);
        }
        let signed = builder.sign(author)?;

        match store.write(&signed).await? {
            WriteResult::Accepted => Ok(SetResult::Set(signed)),
            WriteResult::Ignored => Ok(SetResult::Rejected(
                "a newer version by this author already exists".into(),
            )),
            WriteResult::Rejected { reason } => {
                warn!(%workspace, path = %signed.path, %reason, "local write rejected");
                Ok(SetResult::Rejected(reason))
            }
        }
    }

    /// Ingest documents pushed by a peer, one outcome per document.
    pub async fn ingest_documents(
        &self,
        workspace: &str,
        documents: Vec<Document>,
    ) -> Result<IngestDocumentsResult> {
        Ok(match self.service().ingest_report(workspace, documents).await? {
            Some(report) => IngestDocumentsResult::Report(report),
            None => IngestDocumentsResult::WorkspaceNotFound,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sync Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Sync one workspace with one peer.
    pub async fn sync_with_peer(&self, workspace: &str, peer: &str) -> SyncOutcome {
        self.orchestrator.sync_once(workspace, peer).await
    }

    /// Sync one workspace with several peers, results in peer order.
    pub async fn sync_with_peers(
        &self,
        workspace: &str,
        peers: &[String],
    ) -> Vec<(String, SyncOutcome)> {
        self.orchestrator.sync_with_peers(workspace, peers).await
    }

    /// Sync several workspaces, each with its own peers.
    pub async fn sync_many(&self, entries: Vec<SyncEntry>) -> Vec<WorkspaceSyncResult> {
        self.orchestrator.sync_many(entries).await
    }

    /// Like [`Node::sync_many`], stopping early once `abort` fires.
    pub async fn sync_many_abortable(
        &self,
        entries: Vec<SyncEntry>,
        abort: &AbortHandle,
    ) -> Vec<WorkspaceSyncResult> {
        self.orchestrator.sync_many_abortable(entries, abort).await
    }

    /// A service answering peers' pulls and pushes for this node's workspaces.
    pub fn service(&self) -> PeerService {
        PeerService::new(self.registry.clone(), self.config.sync_filters.clone())
    }
}
