//! Creating stores for new workspaces, and deciding who may.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use pubsync_core::{AuthorAddress, WorkspaceAddress};
use pubsync_store::{MemoryStore, SqliteStore, StoreError};

use crate::registry::StoreHandle;

/// Creates (or reopens) the store backing a workspace.
#[async_trait]
pub trait Provisioner: Send + Sync {
    async fn create_or_open(
        &self,
        address: &WorkspaceAddress,
    ) -> std::result::Result<StoreHandle, StoreError>;
}

/// Fresh in-memory stores.
#[derive(Debug, Default, Clone)]
pub struct MemoryProvisioner;

#[async_trait]
impl Provisioner for MemoryProvisioner {
    async fn create_or_open(
        &self,
        address: &WorkspaceAddress,
    ) -> std::result::Result<StoreHandle, StoreError> {
        Ok(Arc::new(MemoryStore::new(address.clone())))
    }
}

/// One SQLite file per workspace: `<dir>/<address>.sqlite`.
#[derive(Debug, Clone)]
pub struct SqliteProvisioner {
    dir: PathBuf,
}

impl SqliteProvisioner {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, address: &WorkspaceAddress) -> PathBuf {
        self.dir.join(format!("{}.sqlite", address))
    }
}

#[async_trait]
impl Provisioner for SqliteProvisioner {
    async fn create_or_open(
        &self,
        address: &WorkspaceAddress,
    ) -> std::result::Result<StoreHandle, StoreError> {
        let dir = self.dir.clone();
        let path = self.path_for(address);
        let address = address.clone();
        let store = tokio::task::spawn_blocking(move || {
            std::fs::create_dir_all(&dir)?;
            SqliteStore::open(path, address)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))??;
        Ok(Arc::new(store))
    }
}

/// Decides whether a workspace may be added or removed.
pub trait WorkspacePolicy: Send + Sync {
    fn can_add(&self, address: &WorkspaceAddress, author: Option<&AuthorAddress>) -> bool;

    fn can_remove(&self, address: &WorkspaceAddress, author: Option<&AuthorAddress>) -> bool;
}

/// Anyone may add or remove any workspace.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl WorkspacePolicy for AllowAll {
    fn can_add(&self, _: &WorkspaceAddress, _: Option<&AuthorAddress>) -> bool {
        true
    }

    fn can_remove(&self, _: &WorkspaceAddress, _: Option<&AuthorAddress>) -> bool {
        true
    }
}

/// Only the listed workspaces may be added or removed.
#[derive(Debug, Default, Clone)]
pub struct AllowList {
    workspaces: BTreeSet<WorkspaceAddress>,
}

impl AllowList {
    pub fn new(workspaces: impl IntoIterator<Item = WorkspaceAddress>) -> Self {
        Self {
            workspaces: workspaces.into_iter().collect(),
        }
    }
}

impl WorkspacePolicy for AllowList {
    fn can_add(&self, address: &WorkspaceAddress, _: Option<&AuthorAddress>) -> bool {
        self.workspaces.contains(address)
    }

    fn can_remove(&self, address: &WorkspaceAddress, _: Option<&AuthorAddress>) -> bool {
        self.workspaces.contains(address)
    }
}

/// Policy built from two closures.
pub struct FnPolicy<A, R> {
    can_add: A,
    can_remove: R,
}

impl<A, R> FnPolicy<A, R>
where
    A: Fn(&WorkspaceAddress, Option<&AuthorAddress>) -> bool + Send + Sync,
    R: Fn(&WorkspaceAddress, Option<&AuthorAddress>) -> bool + Send + Sync,
{
    pub fn new(can_add: A, can_remove: R) -> Self {
        Self {
            can_add,
            can_remove,
        }
    }
}

impl<A, R> WorkspacePolicy for FnPolicy<A, R>
where
    A: Fn(&WorkspaceAddress, Option<&AuthorAddress>) -> bool + Send + Sync,
    R: Fn(&WorkspaceAddress, Option<&AuthorAddress>) -> bool + Send + Sync,
{
    fn can_add(&self, address: &WorkspaceAddress, author: Option<&AuthorAddress>) -> bool {
        (self.can_add)(address, author)
    }

    fn can_remove(&self, address: &WorkspaceAddress, author: Option<&AuthorAddress>) -> bool {
        (self.can_remove)(address, author)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubsync_store::DocumentStore;

    fn ws(s: &str) -> WorkspaceAddress {
        WorkspaceAddress::parse(s).unwrap()
    }

    #[test]
    fn test_allow_list() {
        let policy = AllowList::new([ws("+ok.abc")]);
        assert!(policy.can_add(&ws("+ok.abc"), None));
        assert!(!policy.can_add(&ws("+no.abc"), None));
    }

    #[test]
    fn test_fn_policy() {
        let policy = FnPolicy::new(
            |a: &WorkspaceAddress, _: Option<&AuthorAddress>| a.name() == "ok",
            |_: &WorkspaceAddress, _: Option<&AuthorAddress>| false,
        );
        assert!(policy.can_add(&ws("+ok.abc"), None));
        assert!(!policy.can_remove(&ws("+ok.abc"), None));
    }

    #[tokio::test]
    async fn test_sqlite_provisioner_reopens_file() {
        let dir = tempfile::tempdir().unwrap();
        let provisioner = SqliteProvisioner::new(dir.path().join("stores"));
        let address = ws("+test.abc");

        let store = provisioner.create_or_open(&address).await.unwrap();
        assert_eq!(store.address(), &address);
        drop(store);

        assert!(provisioner.path_for(&address).exists());
        provisioner.create_or_open(&address).await.unwrap();
    }
}
