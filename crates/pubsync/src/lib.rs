//! # pubsync
//!
//! The unified API for pubsync: workspace replicas of signed documents that
//! sync with remote peers.
//!
//! ## Overview
//!
//! A [`Node`] holds a set of workspaces and provides:
//!
//! - **Workspaces**: add and remove replicas, subject to a policy
//! - **Documents**: sign and write documents as a local author
//! - **Ingestion**: accept documents pushed by peers, one outcome each
//! - **Sync**: pull-then-push sessions with many peers at once
//!
//! ## Key Concepts
//!
//! - **Document**: one author's signed version of one path. Newer versions
//!   by the same author replace older ones.
//! - **Tombstone**: a document with empty content.
//! - **Filters**: the interest a replica declares; peers send only what
//!   matches.
//! - **Outcome**: every `(workspace, peer)` pair gets its own result.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pubsync::{NewDocument, Node, NodeConfig};
//! use pubsync::core::AuthorKeypair;
//! use pubsync::sync::HttpConnector;
//!
//! async fn example() {
//!     let node = Node::new(NodeConfig::default(), Arc::new(HttpConnector::new()))
//!         .await
//!         .unwrap();
//!     node.add_workspace("+gardening.a1b2", None).await.unwrap();
//!
//!     let author = AuthorKeypair::generate("suzy").unwrap();
//!     node.set("+gardening.a1b2", &author, NewDocument::new("/wiki/shrubs", "Shrubs"))
//!         .await
//!         .unwrap();
//!
//!     let outcome = node
//!         .sync_with_peer("+gardening.a1b2", "https://pub.example.com")
//!         .await;
//!     println!("{:?}", outcome);
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `pubsync::core` - Documents, addresses, filters, validation
//! - `pubsync::store` - Storage abstraction, SQLite and in-memory
//! - `pubsync::sync` - Sync sessions, orchestration, transports

pub mod error;
pub mod node;

// Re-export component crates
pub use pubsync_core as core;
pub use pubsync_store as store;
pub use pubsync_sync as sync;

// Re-export main types for convenience
pub use error::{NodeError, Result};
pub use node::{
    AddWorkspaceResult, IngestDocumentsResult, NewDocument, Node, NodeConfig,
    RemoveWorkspaceResult, SetResult, StorageMode,
};

// Re-export commonly used types
pub use pubsync_core::{AuthorAddress, AuthorKeypair, Document, SyncFilters, WorkspaceAddress};
pub use pubsync_sync::{
    AbortHandle, IngestionOutcome, IngestionReport, SyncConfig, SyncEntry, SyncOutcome,
    WorkspaceSyncResult,
};
