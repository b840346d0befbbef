//! # pubsync testkit
//!
//! Testing utilities for pubsync.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: deterministic authors, document builders, seeded stores
//! - **Test networks**: in-process nodes that sync with each other
//! - **Generators**: Proptest strategies for property-based testing
//!
//! ## Test Fixtures
//!
//! ```rust
//! use pubsync_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let doc = fixture.make_doc("/wiki/shrubs", "Shrubs");
//! assert_eq!(doc.author, fixture.author_address());
//! ```
//!
//! ## Test Networks
//!
//! ```rust,no_run
//! use pubsync_testkit::{TestNetwork, TEST_WORKSPACE};
//!
//! async fn example() {
//!     let net = TestNetwork::new();
//!     let remote = net.node().await;
//!     remote.add_workspace(TEST_WORKSPACE, None).await.unwrap();
//!     net.serve("mem://remote", &remote).await;
//!
//!     let local = net.node().await;
//!     let outcome = local.sync_with_peer(TEST_WORKSPACE, "mem://remote").await;
//!     assert!(outcome.is_success());
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use pubsync_testkit::generators::{document_from_params, DocParams};
//!
//! proptest! {
//!     #[test]
//!     fn documents_validate(params: DocParams) {
//!         let doc = document_from_params(&params, &workspace);
//!         prop_assert!(validate_document(&doc, &workspace, now_micros()).is_ok());
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{
    author_from_seed, init_tracing, multi_party_authors, test_workspace, TestFixture, TestNetwork,
    TEST_WORKSPACE,
};
pub use generators::{document_from_params, DocParams};
