//! Wire messages exchanged with peers.
//!
//! JSON bodies for the Rich dialect. The Legacy dialect only moves bare
//! document lists; its clients shape replies into these same types.

use serde::{Deserialize, Serialize};

use pubsync_core::{Document, SyncFilters};

/// Current Rich protocol version, reported by the probe.
pub const PROTOCOL_VERSION: u32 = 1;

/// Ask a peer for its declared filters and the documents we want.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub workspace: String,
    /// The requester's filters; the peer selects documents with them.
    pub filters: SyncFilters,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PullReply {
    /// The peer's own declared filters plus matching documents, tombstones
    /// included.
    Documents {
        filters: SyncFilters,
        documents: Vec<Document>,
    },
    #[serde(rename_all = "camelCase")]
    WorkspaceNotFound { workspace: String },
}

/// Hand documents to a peer for ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    pub workspace: String,
    pub documents: Vec<Document>,
}

/// Per-document ingestion result as reported by a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IngestStatus {
    Accepted,
    Ignored,
    Rejected { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum IngestReply {
    /// One status per submitted document, in submission order.
    Report { results: Vec<IngestStatus> },
    /// Legacy peers only say the batch went through.
    Accepted,
    #[serde(rename_all = "camelCase")]
    WorkspaceNotFound { workspace: String },
}

/// Answer to the protocol probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResponse {
    pub protocol_version: u32,
}

impl Default for ProbeResponse {
    fn default() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_reply_json() {
        let reply = PullReply::WorkspaceNotFound {
            workspace: "+test.abc".into(),
        };
        let json = serde_json::to_string(&reply).unwrap();
        assert_eq!(json, r#"{"type":"workspaceNotFound","workspace":"+test.abc"}"#);

        let docs: PullReply =
            serde_json::from_str(r#"{"type":"documents","filters":{},"documents":[]}"#).unwrap();
        assert_eq!(
            docs,
            PullReply::Documents {
                filters: SyncFilters::default(),
                documents: vec![]
            }
        );
    }

    #[test]
    fn test_ingest_status_json() {
        let statuses = vec![
            IngestStatus::Accepted,
            IngestStatus::Rejected {
                reason: "bad".into(),
            },
        ];
        let json = serde_json::to_string(&statuses).unwrap();
        assert_eq!(
            json,
            r#"[{"result":"ACCEPTED"},{"result":"REJECTED","reason":"bad"}]"#
        );
    }
}
