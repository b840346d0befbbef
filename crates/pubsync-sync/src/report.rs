//! Ingestion reports and per-peer sync outcomes.

use serde::{Deserialize, Serialize};

use pubsync_core::Document;

use crate::messages::IngestStatus;

/// What happened to one document handed to a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IngestionOutcome {
    Accepted { document: Document },
    Ignored { document: Document },
    Rejected { document: Document, reason: String },
}

impl IngestionOutcome {
    /// Pair a peer-reported status with the document it refers to.
    pub fn from_status(document: Document, status: IngestStatus) -> Self {
        match status {
            IngestStatus::Accepted => Self::Accepted { document },
            IngestStatus::Ignored => Self::Ignored { document },
            IngestStatus::Rejected { reason } => Self::Rejected { document, reason },
        }
    }

    pub fn document(&self) -> &Document {
        match self {
            Self::Accepted { document }
            | Self::Ignored { document }
            | Self::Rejected { document, .. } => document,
        }
    }

    /// The wire status, without the document.
    pub fn status(&self) -> IngestStatus {
        match self {
            Self::Accepted { .. } => IngestStatus::Accepted,
            Self::Ignored { .. } => IngestStatus::Ignored,
            Self::Rejected { reason, .. } => IngestStatus::Rejected {
                reason: reason.clone(),
            },
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Outcomes for a batch of documents, in the order they were handled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionReport {
    pub documents: Vec<IngestionOutcome>,
}

impl IngestionReport {
    pub fn push(&mut self, outcome: IngestionOutcome) {
        self.documents.push(outcome);
    }

    pub fn accepted_count(&self) -> usize {
        self.documents.iter().filter(|o| o.is_accepted()).count()
    }

    pub fn ignored_count(&self) -> usize {
        self.documents
            .iter()
            .filter(|o| matches!(o, IngestionOutcome::Ignored { .. }))
            .count()
    }

    pub fn rejected_count(&self) -> usize {
        self.documents
            .iter()
            .filter(|o| matches!(o, IngestionOutcome::Rejected { .. }))
            .count()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Statuses in document order, as sent back to a pushing peer.
    pub fn statuses(&self) -> Vec<IngestStatus> {
        self.documents.iter().map(IngestionOutcome::status).collect()
    }
}

/// Result of syncing one workspace with one peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SyncOutcome {
    /// Legacy peers: the exchange completed, no per-document detail.
    Success { workspace: String },
    /// Rich peers: what the peer did with our documents, and what we did
    /// with theirs.
    DetailedSuccess {
        workspace: String,
        pushed: IngestionReport,
        pulled: IngestionReport,
    },
    Error { reason: String },
    WorkspaceNotFound { address: String },
    WorkspaceInvalid { address: String, reason: String },
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::DetailedSuccess { .. })
    }
}
