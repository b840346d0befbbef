//! Multi-peer orchestration.
//!
//! Every `(workspace, peer)` pair is an independent session. Peers of one
//! workspace run concurrently up to `max_concurrent_peers`; workspaces in a
//! batch run concurrently with each other. One peer's failure never affects
//! another's result.

use std::sync::Arc;

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use tracing::{info, info_span, warn, Instrument};

use pubsync_core::{SyncFilters, WorkspaceAddress};

use crate::config::SyncConfig;
use crate::detect::detect_protocol;
use crate::error::SyncError;
use crate::peer::Connector;
use crate::provision::{Provisioner, WorkspacePolicy};
use crate::registry::{StoreHandle, WorkspaceRegistry};
use crate::report::SyncOutcome;
use crate::session::{AbortHandle, SyncSession};

/// One workspace and the peers to sync it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncEntry {
    pub workspace: String,
    pub peers: Vec<String>,
}

impl SyncEntry {
    pub fn new(
        workspace: impl Into<String>,
        peers: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            workspace: workspace.into(),
            peers: peers.into_iter().map(Into::into).collect(),
        }
    }
}

/// Per-peer results for one workspace, in peer input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceSyncResult {
    pub workspace: String,
    pub results: Vec<(String, SyncOutcome)>,
}

/// How a workspace address resolved before any network traffic.
enum Resolved {
    Registered(StoreHandle),
    /// Provisioned for this call; registered once a session starts.
    Provisioned(StoreHandle),
    Failed(SyncOutcome),
}

/// Runs sync sessions against many peers.
pub struct Orchestrator {
    registry: Arc<WorkspaceRegistry>,
    provisioner: Arc<dyn Provisioner>,
    policy: Arc<dyn WorkspacePolicy>,
    connector: Arc<dyn Connector>,
    filters: SyncFilters,
    config: SyncConfig,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<WorkspaceRegistry>,
        provisioner: Arc<dyn Provisioner>,
        policy: Arc<dyn WorkspacePolicy>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            registry,
            provisioner,
            policy,
            connector,
            filters: SyncFilters::default(),
            config: SyncConfig::default(),
        }
    }

    /// The filters this replica declares: what it wants to receive.
    pub fn with_filters(mut self, filters: SyncFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &Arc<WorkspaceRegistry> {
        &self.registry
    }

    /// Sync one workspace with one peer.
    pub async fn sync_once(&self, workspace: &str, peer: &str) -> SyncOutcome {
        let mut results = self
            .sync_with_peers(workspace, &[peer.to_string()])
            .await;
        match results.pop() {
            Some((_, outcome)) => outcome,
            None => SyncOutcome::Error {
                reason: "no result for peer".into(),
            },
        }
    }

    /// Sync one workspace with several peers concurrently.
    pub async fn sync_with_peers(
        &self,
        workspace: &str,
        peers: &[String],
    ) -> Vec<(String, SyncOutcome)> {
        self.sync_with_peers_abortable(workspace, peers, &AbortHandle::new())
            .await
    }

    pub async fn sync_with_peers_abortable(
        &self,
        workspace: &str,
        peers: &[String],
        abort: &AbortHandle,
    ) -> Vec<(String, SyncOutcome)> {
        if abort.is_aborted() {
            let outcome = SyncOutcome::Error {
                reason: SyncError::Cancelled.to_string(),
            };
            return peers
                .iter()
                .map(|peer| (peer.clone(), outcome.clone()))
                .collect();
        }

        let (store, fresh) = match self.resolve(workspace).await {
            Resolved::Registered(store) => (store, false),
            Resolved::Provisioned(store) => (store, true),
            Resolved::Failed(outcome) => {
                return peers
                    .iter()
                    .map(|peer| (peer.clone(), outcome.clone()))
                    .collect();
            }
        };

        let limit = self.config.max_concurrent_peers.max(1);
        stream::iter(peers.iter().cloned())
            .map(|peer| {
                let store = store.clone();
                async move {
                    let outcome = self.sync_peer(store, fresh, &peer, abort).await;
                    (peer, outcome)
                }
            })
            .buffered(limit)
            .collect()
            .await
    }

    /// Sync several workspaces, each with its own peers.
    ///
    /// Entries naming the same workspace are merged (peers concatenated in
    /// order) so the workspace is provisioned once.
    pub async fn sync_many(&self, entries: Vec<SyncEntry>) -> Vec<WorkspaceSyncResult> {
        self.sync_many_abortable(entries, &AbortHandle::new()).await
    }

    pub async fn sync_many_abortable(
        &self,
        entries: Vec<SyncEntry>,
        abort: &AbortHandle,
    ) -> Vec<WorkspaceSyncResult> {
        let entries = coalesce(entries);
        join_all(entries.into_iter().map(|entry| async move {
            let results = self
                .sync_with_peers_abortable(&entry.workspace, &entry.peers, abort)
                .await;
            WorkspaceSyncResult {
                workspace: entry.workspace,
                results,
            }
        }))
        .await
    }

    async fn resolve(&self, workspace: &str) -> Resolved {
        let address = match WorkspaceAddress::parse(workspace) {
            Ok(address) => address,
            Err(e) => {
                warn!(%workspace, error = %e, "invalid workspace address");
                return Resolved::Failed(SyncOutcome::WorkspaceInvalid {
                    address: workspace.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        if let Some(store) = self.registry.get(&address).await {
            return Resolved::Registered(store);
        }

        if !self.policy.can_add(&address, None) {
            info!(%workspace, "not permitted to add workspace");
            return Resolved::Failed(SyncOutcome::WorkspaceNotFound {
                address: workspace.to_string(),
            });
        }

        match self
            .registry
            .provision(&address, self.provisioner.as_ref())
            .await
        {
            Ok((store, false)) => Resolved::Registered(store),
            Ok((store, true)) => {
                info!(%workspace, "provisioned workspace for sync");
                Resolved::Provisioned(store)
            }
            Err(e) => {
                warn!(%workspace, error = %e, "failed to provision workspace");
                Resolved::Failed(SyncOutcome::WorkspaceInvalid {
                    address: workspace.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn sync_peer(
        &self,
        store: StoreHandle,
        fresh: bool,
        peer: &str,
        abort: &AbortHandle,
    ) -> SyncOutcome {
        let span = info_span!("sync", workspace = %store.address(), peer = %peer);
        async move {
            if abort.is_aborted() {
                return SyncOutcome::Error {
                    reason: SyncError::Cancelled.to_string(),
                };
            }

            // First session to start registers a freshly provisioned store
            let store = if fresh {
                self.registry.register(store).await
            } else {
                store
            };

            let protocol =
                detect_protocol(self.connector.as_ref(), peer, self.config.probe_timeout).await;
            let client = match self.connector.open(peer, protocol) {
                Ok(client) => client,
                Err(e) => {
                    warn!(error = %e, "could not open peer");
                    return SyncOutcome::Error {
                        reason: e.to_string(),
                    };
                }
            };

            SyncSession::new(store, client.as_ref(), &self.filters, &self.config)
                .with_abort(abort.clone())
                .run()
                .await
        }
        .instrument(span)
        .await
    }
}

/// Merge entries for the same workspace, keeping first-seen order.
fn coalesce(entries: Vec<SyncEntry>) -> Vec<SyncEntry> {
    let mut merged: Vec<SyncEntry> = Vec::with_capacity(entries.len());
    for entry in entries {
        match merged.iter_mut().find(|e| e.workspace == entry.workspace) {
            Some(existing) => existing.peers.extend(entry.peers),
            None => merged.push(entry),
        }
    }
    merged
}
