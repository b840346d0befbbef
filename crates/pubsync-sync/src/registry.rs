//! Process-held map from workspace address to store.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use pubsync_core::WorkspaceAddress;
use pubsync_store::{DocumentStore, StoreError};

use crate::provision::Provisioner;

/// Shared handle to a workspace store.
pub type StoreHandle = Arc<dyn DocumentStore>;

/// The set of workspaces this process holds.
///
/// Sync only ever adds entries. Removal is an explicit operation.
#[derive(Default)]
pub struct WorkspaceRegistry {
    stores: RwLock<BTreeMap<WorkspaceAddress, StoreHandle>>,
    /// Provisioned but not yet registered. The lock also serializes provisioning.
    pending: Mutex<BTreeMap<WorkspaceAddress, StoreHandle>>,
}

impl WorkspaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, address: &WorkspaceAddress) -> Option<StoreHandle> {
        self.stores.read().await.get(address).cloned()
    }

    /// Look up by raw address string.
    pub async fn get_str(&self, address: &str) -> Option<StoreHandle> {
        let address = WorkspaceAddress::parse(address).ok()?;
        self.get(&address).await
    }

    pub async fn contains(&self, address: &WorkspaceAddress) -> bool {
        self.stores.read().await.contains_key(address)
    }

    /// Register `store` under its own address unless something is already
    /// registered there. Returns the store that ends up registered.
    pub async fn register(&self, store: StoreHandle) -> StoreHandle {
        let address = store.address().clone();
        let kept = self
            .stores
            .write()
            .await
            .entry(address.clone())
            .or_insert(store)
            .clone();
        self.pending.lock().await.remove(&address);
        kept
    }

    /// The store for `address`, provisioning one if needed.
    ///
    /// Returns the store and whether it still has to be registered. Callers
    /// racing on the same address share one provisioned store, so the
    /// provisioner never opens the same workspace twice at once.
    pub async fn provision(
        &self,
        address: &WorkspaceAddress,
        provisioner: &dyn Provisioner,
    ) -> std::result::Result<(StoreHandle, bool), StoreError> {
        let mut pending = self.pending.lock().await;
        if let Some(store) = self.get(address).await {
            return Ok((store, false));
        }
        if let Some(store) = pending.get(address) {
            return Ok((store.clone(), true));
        }
        let store = provisioner.create_or_open(address).await?;
        pending.insert(address.clone(), store.clone());
        Ok((store, true))
    }

    pub async fn remove(&self, address: &WorkspaceAddress) -> Option<StoreHandle> {
        self.stores.write().await.remove(address)
    }

    /// Registered addresses, sorted.
    pub async fn addresses(&self) -> Vec<WorkspaceAddress> {
        self.stores.read().await.keys().cloned().collect()
    }
}
