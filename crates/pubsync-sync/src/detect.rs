//! Peer protocol detection.

use std::time::Duration;

use tracing::debug;

use crate::peer::{Connector, Protocol};

/// Work out which dialect the peer at `url` speaks.
///
/// A successful probe means Rich. Anything else, including a network
/// failure or a probe slower than `timeout`, means Legacy. Never fails and
/// is never cached: each session probes again.
pub async fn detect_protocol(connector: &dyn Connector, url: &str, timeout: Duration) -> Protocol {
    let protocol = match tokio::time::timeout(timeout, connector.probe(url)).await {
        Ok(Ok(())) => Protocol::Rich,
        Ok(Err(e)) => {
            debug!(peer = %url, error = %e, "probe failed, assuming legacy peer");
            Protocol::Legacy
        }
        Err(_) => {
            debug!(peer = %url, "probe timed out, assuming legacy peer");
            Protocol::Legacy
        }
    };
    debug!(peer = %url, %protocol, "detected peer protocol");
    protocol
}
