//! Peer-facing responder: answers pull, ingest and probe requests for the
//! workspaces in a registry.

use std::sync::Arc;

use tracing::debug;

use pubsync_core::{Document, SyncFilters};

use crate::classify::classify_all;
use crate::error::Result;
use crate::messages::{IngestReply, IngestRequest, ProbeResponse, PullReply, PullRequest};
use crate::registry::WorkspaceRegistry;
use crate::report::IngestionReport;

/// Serves this replica's workspaces to peers.
#[derive(Clone)]
pub struct PeerService {
    registry: Arc<WorkspaceRegistry>,
    /// Declared to every peer that pulls from us.
    filters: SyncFilters,
}

impl PeerService {
    pub fn new(registry: Arc<WorkspaceRegistry>, filters: SyncFilters) -> Self {
        Self { registry, filters }
    }

    pub fn filters(&self) -> &SyncFilters {
        &self.filters
    }

    pub fn probe(&self) -> ProbeResponse {
        ProbeResponse::default()
    }

    /// Our declared filters plus documents matching the requester's filters,
    /// tombstones included.
    pub async fn pull(&self, request: PullRequest) -> Result<PullReply> {
        let Some(store) = self.registry.get_str(&request.workspace).await else {
            return Ok(PullReply::WorkspaceNotFound {
                workspace: request.workspace,
            });
        };
        let documents = store.query(&request.filters, true).await?;
        debug!(workspace = %request.workspace, count = documents.len(), "serving pull");
        Ok(PullReply::Documents {
            filters: self.filters.clone(),
            documents,
        })
    }

    /// Classify each pushed document into the local store.
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestReply> {
        match self.ingest_report(&request.workspace, request.documents).await? {
            Some(report) => Ok(IngestReply::Report {
                results: report.statuses(),
            }),
            None => Ok(IngestReply::WorkspaceNotFound {
                workspace: request.workspace,
            }),
        }
    }

    /// Full ingestion report, or `None` if the workspace is not held here.
    pub async fn ingest_report(
        &self,
        workspace: &str,
        documents: Vec<Document>,
    ) -> Result<Option<IngestionReport>> {
        let Some(store) = self.registry.get_str(workspace).await else {
            return Ok(None);
        };
        let report = classify_all(store.as_ref(), documents).await?;
        debug!(
            %workspace,
            accepted = report.accepted_count(),
            total = report.len(),
            "ingested pushed documents"
        );
        Ok(Some(report))
    }

    /// Legacy dialect: every document, unfiltered.
    pub async fn legacy_documents(&self, workspace: &str) -> Result<Option<Vec<Document>>> {
        let Some(store) = self.registry.get_str(workspace).await else {
            return Ok(None);
        };
        Ok(Some(store.documents().await?))
    }

    /// Legacy dialect: ingest and report only whether the workspace exists.
    pub async fn legacy_ingest(&self, workspace: &str, documents: Vec<Document>) -> Result<bool> {
        Ok(self.ingest_report(workspace, documents).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubsync_core::{now_micros, AuthorKeypair, DocumentBuilder, WorkspaceAddress};
    use pubsync_store::MemoryStore;

    use crate::messages::IngestStatus;

    async fn service_with(filters: SyncFilters) -> (PeerService, AuthorKeypair) {
        let registry = Arc::new(WorkspaceRegistry::new());
        let ws = WorkspaceAddress::parse("+test.abc").unwrap();
        registry.register(Arc::new(MemoryStore::new(ws))).await;
        let suzy = AuthorKeypair::from_seed("suzy", &[1; 32]).unwrap();
        (PeerService::new(registry, filters), suzy)
    }

    fn doc(author: &AuthorKeypair, path: &str, content: &str) -> Document {
        DocumentBuilder::new(WorkspaceAddress::parse("+test.abc").unwrap(), path)
            .content(content)
            .timestamp(now_micros())
            .sign(author)
            .unwrap()
    }

    #[tokio::test]
    async fn test_pull_declares_filters_and_includes_tombstones() {
        let declared = SyncFilters::default().with_path_prefix("/wanted");
        let (service, suzy) = service_with(declared.clone()).await;
        service
            .ingest_report("+test.abc", vec![doc(&suzy, "/a", "x"), doc(&suzy, "/b", "")])
            .await
            .unwrap();

        let reply = service
            .pull(PullRequest {
                workspace: "+test.abc".into(),
                filters: SyncFilters::default(),
            })
            .await
            .unwrap();
        match reply {
            PullReply::Documents { filters, documents } => {
                assert_eq!(filters, declared);
                assert_eq!(documents.len(), 2);
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ingest_reports_each_document() {
        let (service, suzy) = service_with(SyncFilters::default()).await;
        let good = doc(&suzy, "/a", "x");
        let mut forged = doc(&suzy, "/b", "y");
        forged.content = "tampered".into();

        let reply = service
            .ingest(IngestRequest {
                workspace: "+test.abc".into(),
                documents: vec![good.clone(), good, forged],
            })
            .await
            .unwrap();
        let IngestReply::Report { results } = reply else {
            panic!("expected a report");
        };
        assert_eq!(results[0], IngestStatus::Accepted);
        assert_eq!(results[1], IngestStatus::Ignored);
        assert!(matches!(results[2], IngestStatus::Rejected { .. }));
    }

    #[tokio::test]
    async fn test_unknown_workspace() {
        let (service, _) = service_with(SyncFilters::default()).await;

        assert!(matches!(
            service
                .pull(PullRequest {
                    workspace: "+other.abc".into(),
                    filters: SyncFilters::default(),
                })
                .await
                .unwrap(),
            PullReply::WorkspaceNotFound { .. }
        ));
        assert!(service
            .legacy_documents("+other.abc")
            .await
            .unwrap()
            .is_none());
        assert!(!service.legacy_ingest("+other.abc", vec![]).await.unwrap());
    }
}
