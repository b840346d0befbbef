//! # pubsync sync
//!
//! Pull-then-push reconciliation of workspace replicas with remote peers.
//!
//! ## Overview
//!
//! A [`SyncSession`] exchanges documents between one local store and one
//! peer. The [`Orchestrator`] fans sessions out over many peers and
//! workspaces, provisioning unknown workspaces when the
//! [`WorkspacePolicy`] allows it. [`PeerService`] is the other side: it
//! answers pulls and ingests for the workspaces in a [`WorkspaceRegistry`].
//!
//! ## Key Properties
//!
//! - **Filter negotiation**: each side declares the documents it wants
//! - **No echo**: documents are ingested after the push, and anything just
//!   pulled is dropped from the push set
//! - **Isolated**: one peer's failure never affects another's result
//! - **Two dialects**: Rich peers report per-document results; Legacy peers
//!   serve everything and only report success
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pubsync_sync::{
//!     AllowAll, HttpConnector, MemoryProvisioner, Orchestrator, WorkspaceRegistry,
//! };
//!
//! async fn example() {
//!     let orchestrator = Orchestrator::new(
//!         Arc::new(WorkspaceRegistry::new()),
//!         Arc::new(MemoryProvisioner),
//!         Arc::new(AllowAll),
//!         Arc::new(HttpConnector::new()),
//!     );
//!     let outcome = orchestrator
//!         .sync_once("+gardening.a1b2", "https://pub.example.com")
//!         .await;
//!     println!("{:?}", outcome);
//! }
//! ```

pub mod classify;
pub mod config;
pub mod detect;
pub mod error;
pub mod messages;
pub mod orchestrator;
pub mod peer;
pub mod provision;
pub mod registry;
pub mod report;
pub mod service;
pub mod session;
pub mod transport;

pub use classify::{classify, classify_all};
pub use config::SyncConfig;
pub use detect::detect_protocol;
pub use error::{Result, SyncError};
pub use messages::{
    IngestReply, IngestRequest, IngestStatus, ProbeResponse, PullReply, PullRequest,
    PROTOCOL_VERSION,
};
pub use orchestrator::{Orchestrator, SyncEntry, WorkspaceSyncResult};
pub use peer::{Connector, PeerClient, Protocol};
pub use provision::{
    AllowAll, AllowList, FnPolicy, MemoryProvisioner, Provisioner, SqliteProvisioner,
    WorkspacePolicy,
};
pub use registry::{StoreHandle, WorkspaceRegistry};
pub use report::{IngestionOutcome, IngestionReport, SyncOutcome};
pub use service::PeerService;
pub use session::{AbortHandle, SyncSession};
pub use transport::http::{HttpConnector, HttpPeerClient};
pub use transport::memory::{MemoryConnector, MemoryNetwork, MemoryPeerClient};
