//! HTTP transport over reqwest with JSON bodies.
//!
//! Rich routes:
//! - `GET  {url}/sync/probe`
//! - `POST {url}/sync/pull`
//! - `POST {url}/sync/ingest`
//!
//! Legacy routes: `GET`/`POST {url}/earthstar-api/v1/{workspace}/documents`,
//! where 404 means the peer does not hold the workspace.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use pubsync_core::{Document, SyncFilters, WorkspaceAddress};

use crate::error::{Result, SyncError};
use crate::messages::{IngestReply, IngestRequest, ProbeResponse, PullReply, PullRequest};
use crate::peer::{Connector, PeerClient, Protocol};

fn request_error(e: reqwest::Error) -> SyncError {
    if e.is_decode() {
        SyncError::ProtocolMismatch(e.to_string())
    } else {
        SyncError::Network(e.to_string())
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = response.error_for_status().map_err(request_error)?;
    response.json::<T>().await.map_err(request_error)
}

/// Opens [`HttpPeerClient`]s sharing one connection pool.
#[derive(Clone, Default)]
pub struct HttpConnector {
    client: Client,
}

impl HttpConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn probe(&self, url: &str) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/sync/probe", base(url)))
            .send()
            .await
            .map_err(request_error)?;
        read_json::<ProbeResponse>(response).await.map(|_| ())
    }

    fn open(&self, url: &str, protocol: Protocol) -> Result<Box<dyn PeerClient>> {
        reqwest::Url::parse(url).map_err(|e| SyncError::Network(format!("bad url {}: {}", url, e)))?;
        Ok(Box::new(HttpPeerClient {
            client: self.client.clone(),
            url: url.to_string(),
            protocol,
        }))
    }
}

fn base(url: &str) -> &str {
    url.trim_end_matches('/')
}

/// HTTP peer client for either dialect.
pub struct HttpPeerClient {
    client: Client,
    url: String,
    protocol: Protocol,
}

impl HttpPeerClient {
    fn legacy_url(&self, workspace: &WorkspaceAddress) -> String {
        format!("{}/earthstar-api/v1/{}/documents", base(&self.url), workspace)
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    fn url(&self) -> &str {
        &self.url
    }

    fn protocol(&self) -> Protocol {
        self.protocol
    }

    async fn pull(&self, workspace: &WorkspaceAddress, filters: &SyncFilters) -> Result<PullReply> {
        match self.protocol {
            Protocol::Rich => {
                let response = self
                    .client
                    .post(format!("{}/sync/pull", base(&self.url)))
                    .json(&PullRequest {
                        workspace: workspace.to_string(),
                        filters: filters.clone(),
                    })
                    .send()
                    .await
                    .map_err(request_error)?;
                read_json(response).await
            }
            Protocol::Legacy => {
                let response = self
                    .client
                    .get(self.legacy_url(workspace))
                    .send()
                    .await
                    .map_err(request_error)?;
                if response.status() == StatusCode::NOT_FOUND {
                    return Ok(PullReply::WorkspaceNotFound {
                        workspace: workspace.to_string(),
                    });
                }
                let documents: Vec<Document> = read_json(response).await?;
                Ok(PullReply::Documents {
                    filters: SyncFilters::unfiltered(),
                    documents,
                })
            }
        }
    }

    async fn push(
        &self,
        workspace: &WorkspaceAddress,
        documents: &[Document],
    ) -> Result<IngestReply> {
        match self.protocol {
            Protocol::Rich => {
                let response = self
                    .client
                    .post(format!("{}/sync/ingest", base(&self.url)))
                    .json(&IngestRequest {
                        workspace: workspace.to_string(),
                        documents: documents.to_vec(),
                    })
                    .send()
                    .await
                    .map_err(request_error)?;
                read_json(response).await
            }
            Protocol::Legacy => {
                let response = self
                    .client
                    .post(self.legacy_url(workspace))
                    .json(documents)
                    .send()
                    .await
                    .map_err(request_error)?;
                if response.status() == StatusCode::NOT_FOUND {
                    return Ok(IngestReply::WorkspaceNotFound {
                        workspace: workspace.to_string(),
                    });
                }
                response.error_for_status().map_err(request_error)?;
                Ok(IngestReply::Accepted)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::detect_protocol;
    use std::time::Duration;

    #[test]
    fn test_legacy_url() {
        let client = HttpPeerClient {
            client: Client::new(),
            url: "https://pub.example.com/".into(),
            protocol: Protocol::Legacy,
        };
        let ws = WorkspaceAddress::parse("+test.abc").unwrap();
        assert_eq!(
            client.legacy_url(&ws),
            "https://pub.example.com/earthstar-api/v1/+test.abc/documents"
        );
    }

    #[test]
    fn test_open_rejects_bad_url() {
        let connector = HttpConnector::new();
        assert!(connector.open("not a url", Protocol::Rich).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_peer() {
        let connector = HttpConnector::new();
        // Nothing listens on port 1
        let url = "http://127.0.0.1:1";
        assert_eq!(
            detect_protocol(&connector, url, Duration::from_secs(5)).await,
            Protocol::Legacy
        );

        let client = connector.open(url, Protocol::Rich).unwrap();
        let ws = WorkspaceAddress::parse("+test.abc").unwrap();
        assert!(matches!(
            client.pull(&ws, &SyncFilters::default()).await,
            Err(SyncError::Network(_))
        ));
    }
}
