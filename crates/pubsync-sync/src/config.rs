//! Configuration for sync behavior.

use std::time::Duration;

/// Configuration for sync sessions and the orchestrator.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Bound on each network phase (pull, push).
    pub request_timeout: Duration,
    /// Bound on the protocol probe. A probe that times out means Legacy.
    pub probe_timeout: Duration,
    /// How many peers of one workspace are synced at once.
    pub max_concurrent_peers: usize,
    /// Whether tombstones are pushed to peers that declare no filters.
    pub push_tombstones_to_unfiltered: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(5),
            max_concurrent_peers: 8,
            push_tombstones_to_unfiltered: true,
        }
    }
}
