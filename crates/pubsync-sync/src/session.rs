//! Two-phase sync session: pull, assemble, push, then ingest.
//!
//! ```text
//! Local                               Peer
//!   |-------- Pull(our filters) ------->|
//!   |<------- peer filters + docs ------|
//!   |   (assemble push set from local   |
//!   |    state using peer filters)      |
//!   |-------- Ingest(push set) -------->|
//!   |<------- per-document results ----|
//!   |   (ingest pulled docs locally)    |
//! ```
//!
//! Ingesting last keeps the push set free of documents we just received.

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::{debug, info, warn};

use pubsync_core::{Document, SyncFilters, WorkspaceAddress};

use crate::classify::classify;
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::messages::{IngestReply, PullReply};
use crate::peer::{PeerClient, Protocol};
use crate::registry::StoreHandle;
use crate::report::{IngestionOutcome, IngestionReport, SyncOutcome};

/// Cancels every session that shares it.
///
/// Once triggered, sessions stop at their next suspension point, apply
/// nothing further locally, and end with `Error("sync cancelled")`.
#[derive(Clone, Default)]
pub struct AbortHandle {
    inner: Arc<AbortInner>,
}

#[derive(Default)]
struct AbortInner {
    aborted: AtomicBool,
    notify: Notify,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.inner.aborted.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.aborted.load(Ordering::SeqCst)
    }

    /// Resolves once `abort` has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_aborted() {
                return;
            }
            notified.await;
        }
    }

    fn check(&self) -> Result<()> {
        if self.is_aborted() {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for AbortHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbortHandle")
            .field("aborted", &self.is_aborted())
            .finish()
    }
}

/// One exchange between a local store and one peer.
pub struct SyncSession<'a> {
    store: StoreHandle,
    peer: &'a dyn PeerClient,
    filters: &'a SyncFilters,
    config: &'a SyncConfig,
    abort: AbortHandle,
}

impl<'a> SyncSession<'a> {
    /// `filters` are the local replica's declared filters: what we want to
    /// receive.
    pub fn new(
        store: StoreHandle,
        peer: &'a dyn PeerClient,
        filters: &'a SyncFilters,
        config: &'a SyncConfig,
    ) -> Self {
        Self {
            store,
            peer,
            filters,
            config,
            abort: AbortHandle::new(),
        }
    }

    pub fn with_abort(mut self, abort: AbortHandle) -> Self {
        self.abort = abort;
        self
    }

    /// Run the exchange. Failures become `SyncOutcome::Error`.
    pub async fn run(self) -> SyncOutcome {
        let workspace = self.store.address().clone();
        match self.exchange(&workspace).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(peer = %self.peer.url(), error = %e, "sync failed");
                SyncOutcome::Error {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn exchange(&self, workspace: &WorkspaceAddress) -> Result<SyncOutcome> {
        self.abort.check()?;

        // Phase 1: pull the peer's filters and the documents we want
        let reply = self
            .network("pull", self.peer.pull(workspace, self.filters))
            .await?;
        let (peer_filters, pulled) = match reply {
            PullReply::Documents { filters, documents } => (filters, documents),
            PullReply::WorkspaceNotFound { .. } => {
                info!(peer = %self.peer.url(), "peer does not hold workspace");
                return Ok(SyncOutcome::WorkspaceNotFound {
                    address: workspace.to_string(),
                });
            }
        };
        debug!(count = pulled.len(), "pulled documents");

        // Phase 2: assemble from pre-ingestion state
        let push_set = self.assemble(&peer_filters, &pulled).await?;
        debug!(count = push_set.len(), "assembled push set");

        // Phase 3: push, even if nothing was pulled
        let reply = self
            .network("push", self.peer.push(workspace, &push_set))
            .await?;
        let pushed = match reply {
            IngestReply::Report { results } => {
                if results.len() != push_set.len() {
                    return Err(SyncError::ProtocolMismatch(format!(
                        "peer reported {} results for {} pushed documents",
                        results.len(),
                        push_set.len()
                    )));
                }
                Some(IngestionReport {
                    documents: push_set
                        .into_iter()
                        .zip(results)
                        .map(|(doc, status)| IngestionOutcome::from_status(doc, status))
                        .collect(),
                })
            }
            IngestReply::Accepted => None,
            IngestReply::WorkspaceNotFound { .. } => {
                return Ok(SyncOutcome::WorkspaceNotFound {
                    address: workspace.to_string(),
                });
            }
        };

        // Phase 4: ingest what we pulled
        let pulled = self.ingest(pulled).await?;

        if let Some(pushed) = &pushed {
            info!(
                pushed_accepted = pushed.accepted_count(),
                pushed_total = pushed.len(),
                pulled_accepted = pulled.accepted_count(),
                pulled_total = pulled.len(),
                "sync complete"
            );
        } else {
            info!(
                pulled_accepted = pulled.accepted_count(),
                pulled_total = pulled.len(),
                "sync complete"
            );
        }

        Ok(match (self.peer.protocol(), pushed) {
            (Protocol::Rich, Some(pushed)) => SyncOutcome::DetailedSuccess {
                workspace: workspace.to_string(),
                pushed,
                pulled,
            },
            _ => SyncOutcome::Success {
                workspace: workspace.to_string(),
            },
        })
    }

    /// Local documents the peer wants, minus anything it just sent us.
    async fn assemble(&self, peer_filters: &SyncFilters, pulled: &[Document]) -> Result<Vec<Document>> {
        let include_deleted =
            !peer_filters.is_unfiltered() || self.config.push_tombstones_to_unfiltered;

        let seen: HashSet<(&str, &str, i64, &str)> = pulled
            .iter()
            .map(|d| {
                (
                    d.path.as_str(),
                    d.author.as_str(),
                    d.timestamp,
                    d.signature.as_str(),
                )
            })
            .collect();

        Ok(self
            .store
            .query(peer_filters, include_deleted)
            .await?
            .into_iter()
            .filter(|d| {
                !seen.contains(&(
                    d.path.as_str(),
                    d.author.as_str(),
                    d.timestamp,
                    d.signature.as_str(),
                ))
            })
            .collect())
    }

    async fn ingest(&self, pulled: Vec<Document>) -> Result<IngestionReport> {
        let mut report = IngestionReport::default();
        for document in pulled {
            self.abort.check()?;
            report.push(classify(self.store.as_ref(), document).await?);
        }
        Ok(report)
    }

    /// Bound a network phase by the request timeout and the abort handle.
    async fn network<T, F>(&self, phase: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let timeout = self.config.request_timeout;
        tokio::select! {
            res = tokio::time::timeout(timeout, fut) => res.map_err(|_| {
                SyncError::Timeout(format!("{} took longer than {:?}", phase, timeout))
            })?,
            _ = self.abort.cancelled() => Err(SyncError::Cancelled),
        }
    }
}
