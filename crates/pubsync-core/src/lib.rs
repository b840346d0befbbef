//! # pubsync core
//!
//! Pure primitives for pubsync: documents, addresses, filters and validation.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Document`] - One author's signed version of one path
//! - [`WorkspaceAddress`] / [`AuthorAddress`] - Validated address newtypes
//! - [`SyncFilters`] - The interest a replica declares to its peers
//! - [`AuthorKeypair`] - Signing identity for new documents
//!
//! ## Signing
//!
//! Documents are signed over deterministic CBOR. See [`canonical`] module.

pub mod address;
pub mod canonical;
pub mod crypto;
pub mod document;
pub mod error;
pub mod filters;
pub mod validation;

pub use address::{AuthorAddress, WorkspaceAddress};
pub use canonical::signing_bytes;
pub use crypto::{content_hash, AuthorKeypair, Blake3Hash, Ed25519PublicKey, Ed25519Signature, Keypair};
pub use document::{Document, DocumentBuilder, DOCUMENT_FORMAT};
pub use error::{CoreError, ValidationError};
pub use filters::SyncFilters;
pub use validation::{now_micros, validate_document, validate_path};
