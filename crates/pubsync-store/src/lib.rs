//! # pubsync store
//!
//! Storage abstraction for one workspace replica. Provides a trait-based
//! interface for document persistence with SQLite and in-memory
//! implementations.
//!
//! ## Key Types
//!
//! - [`DocumentStore`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage, one file per workspace
//! - [`MemoryStore`] - In-memory storage
//! - [`WriteResult`] - Outcome of a write: accepted, ignored or rejected
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pubsync_core::WorkspaceAddress;
//! use pubsync_store::{DocumentStore, SqliteStore};
//!
//! async fn example() {
//!     let address = WorkspaceAddress::parse("+gardening.a1b2").unwrap();
//!     let store = SqliteStore::open("gardening.sqlite", address).unwrap();
//!     let docs = store.documents().await.unwrap();
//!     println!("{} documents", docs.len());
//! }
//! ```

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{DocumentStore, WriteResult};
