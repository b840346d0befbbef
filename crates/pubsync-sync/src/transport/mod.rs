//! Peer transports.
//!
//! - [`memory`]: in-process loopback network for tests and embedding
//! - [`http`]: reqwest client speaking both dialects over JSON

pub mod http;
pub mod memory;
