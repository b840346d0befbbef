//! A simple in-memory transport for testing.
//!
//! Routes requests by URL to [`PeerService`]s registered on a shared
//! [`MemoryNetwork`]. Requests and replies pass through JSON so the wire
//! shapes are exercised exactly as over HTTP.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;

use pubsync_core::{Document, SyncFilters, WorkspaceAddress};

use crate::error::{Result, SyncError};
use crate::messages::{IngestReply, IngestRequest, PullReply, PullRequest};
use crate::peer::{Connector, PeerClient, Protocol};
use crate::service::PeerService;

#[derive(Clone)]
struct MemoryPeer {
    service: PeerService,
    protocol: Protocol,
}

/// Shared state for the memory transport network.
#[derive(Default)]
pub struct MemoryNetwork {
    peers: RwLock<HashMap<String, MemoryPeer>>,
    /// Every probe, pull and push that reached the network.
    requests: AtomicUsize,
}

impl MemoryNetwork {
    /// Create a new memory network.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Serve `service` at `url`, speaking the Rich dialect.
    pub async fn add_peer(&self, url: impl Into<String>, service: PeerService) {
        self.insert(url.into(), service, Protocol::Rich).await;
    }

    /// Serve `service` at `url`, speaking only the Legacy dialect.
    pub async fn add_legacy_peer(&self, url: impl Into<String>, service: PeerService) {
        self.insert(url.into(), service, Protocol::Legacy).await;
    }

    async fn insert(&self, url: String, service: PeerService, protocol: Protocol) {
        self.peers
            .write()
            .await
            .insert(url, MemoryPeer { service, protocol });
    }

    /// Make `url` unreachable.
    pub async fn remove_peer(&self, url: &str) {
        self.peers.write().await.remove(url);
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// A connector that opens clients on this network.
    pub fn connector(self: &Arc<Self>) -> MemoryConnector {
        MemoryConnector {
            network: Arc::clone(self),
        }
    }

    async fn route(&self, url: &str) -> Result<MemoryPeer> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.peers
            .read()
            .await
            .get(url)
            .cloned()
            .ok_or_else(|| SyncError::Network(format!("peer unreachable: {}", url)))
    }
}

/// Send a value through JSON, as a real transport would.
fn over_wire<T: Serialize + DeserializeOwned>(value: &T) -> Result<T> {
    let bytes = serde_json::to_vec(value).map_err(|e| SyncError::ProtocolMismatch(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| SyncError::ProtocolMismatch(e.to_string()))
}

/// Errors on the serving side reach the client as a failed request.
fn peer_failure(e: SyncError) -> SyncError {
    SyncError::Network(format!("peer failed: {}", e))
}

/// Opens [`MemoryPeerClient`]s.
#[derive(Clone)]
pub struct MemoryConnector {
    network: Arc<MemoryNetwork>,
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn probe(&self, url: &str) -> Result<()> {
        let peer = self.network.route(url).await?;
        match peer.protocol {
            Protocol::Rich => over_wire(&peer.service.probe()).map(|_| ()),
            Protocol::Legacy => Err(SyncError::Network("probe endpoint not found".into())),
        }
    }

    fn open(&self, url: &str, protocol: Protocol) -> Result<Box<dyn PeerClient>> {
        Ok(Box::new(MemoryPeerClient {
            network: Arc::clone(&self.network),
            url: url.to_string(),
            protocol,
        }))
    }
}

/// In-memory peer client.
pub struct MemoryPeerClient {
    network: Arc<MemoryNetwork>,
    url: String,
    protocol: Protocol,
}

#[async_trait]
impl PeerClient for MemoryPeerClient {
    fn url(&self) -> &str {
        &self.url
    }

    fn protocol(&self) -> Protocol {
        self.protocol
    }

    async fn pull(&self, workspace: &WorkspaceAddress, filters: &SyncFilters) -> Result<PullReply> {
        let peer = self.network.route(&self.url).await?;
        match self.protocol {
            Protocol::Rich => {
                let request = over_wire(&PullRequest {
                    workspace: workspace.to_string(),
                    filters: filters.clone(),
                })?;
                let reply = peer.service.pull(request).await.map_err(peer_failure)?;
                over_wire(&reply)
            }
            Protocol::Legacy => {
                let documents = peer
                    .service
                    .legacy_documents(workspace.as_str())
                    .await
                    .map_err(peer_failure)?;
                Ok(match documents {
                    Some(documents) => PullReply::Documents {
                        filters: SyncFilters::unfiltered(),
                        documents: over_wire(&documents)?,
                    },
                    None => PullReply::WorkspaceNotFound {
                        workspace: workspace.to_string(),
                    },
                })
            }
        }
    }

    async fn push(
        &self,
        workspace: &WorkspaceAddress,
        documents: &[Document],
    ) -> Result<IngestReply> {
        let peer = self.network.route(&self.url).await?;
        match self.protocol {
            Protocol::Rich => {
                let request = over_wire(&IngestRequest {
                    workspace: workspace.to_string(),
                    documents: documents.to_vec(),
                })?;
                let reply = peer.service.ingest(request).await.map_err(peer_failure)?;
                over_wire(&reply)
            }
            Protocol::Legacy => {
                let found = peer
                    .service
                    .legacy_ingest(workspace.as_str(), over_wire(&documents.to_vec())?)
                    .await
                    .map_err(peer_failure)?;
                Ok(if found {
                    IngestReply::Accepted
                } else {
                    IngestReply::WorkspaceNotFound {
                        workspace: workspace.to_string(),
                    }
                })
            }
        }
    }
}
