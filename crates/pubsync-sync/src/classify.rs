//! Ingestion classifier: write a document and say what happened to it.

use tracing::warn;

use pubsync_core::Document;
use pubsync_store::{DocumentStore, WriteResult};

use crate::error::Result;
use crate::report::{IngestionOutcome, IngestionReport};

/// Write `document` into `store` with write-if-newer semantics.
///
/// Validation failures come back as `Rejected` and are never retried. An
/// unexpected store failure is an error, not a classification.
pub async fn classify(store: &dyn DocumentStore, document: Document) -> Result<IngestionOutcome> {
    let outcome = match store.write(&document).await? {
        WriteResult::Accepted => IngestionOutcome::Accepted { document },
        WriteResult::Ignored => IngestionOutcome::Ignored { document },
        WriteResult::Rejected { reason } => {
            warn!(path = %document.path, author = %document.author, %reason, "document rejected");
            IngestionOutcome::Rejected { document, reason }
        }
    };
    Ok(outcome)
}

/// Classify each document in order.
pub async fn classify_all(
    store: &dyn DocumentStore,
    documents: Vec<Document>,
) -> Result<IngestionReport> {
    let mut report = IngestionReport::default();
    for document in documents {
        report.push(classify(store, document).await?);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubsync_core::{now_micros, AuthorKeypair, DocumentBuilder, WorkspaceAddress};
    use pubsync_store::MemoryStore;

    #[tokio::test]
    async fn test_classify_all_outcomes() {
        let ws = WorkspaceAddress::parse("+test.abc").unwrap();
        let store = MemoryStore::new(ws.clone());
        let suzy = AuthorKeypair::from_seed("suzy", &[1; 32]).unwrap();

        let good = DocumentBuilder::new(ws.clone(), "/a")
            .content("x")
            .timestamp(now_micros())
            .sign(&suzy)
            .unwrap();
        let mut bad = good.clone();
        bad.path = "/b".into();

        let report = classify_all(&store, vec![good.clone(), good.clone(), bad])
            .await
            .unwrap();

        assert!(matches!(report.documents[0], IngestionOutcome::Accepted { .. }));
        assert!(matches!(report.documents[1], IngestionOutcome::Ignored { .. }));
        assert!(matches!(report.documents[2], IngestionOutcome::Rejected { .. }));
        assert_eq!(report.len(), 3);
    }
}
