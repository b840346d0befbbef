//! In-memory implementation of the DocumentStore trait.
//!
//! Same semantics as SQLite but keeps everything in memory with no
//! persistence.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::debug;

use pubsync_core::{now_micros, validate_document, Document, SyncFilters, WorkspaceAddress};

use crate::error::{Result, StoreError};
use crate::traits::{newest, DocumentStore, WriteResult};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    address: WorkspaceAddress,
    /// Documents keyed by (path, author).
    docs: RwLock<BTreeMap<(String, String), Document>>,
}

impl MemoryStore {
    /// Create a new empty store for `address`.
    pub fn new(address: WorkspaceAddress) -> Self {
        Self {
            address,
            docs: RwLock::new(BTreeMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<(String, String), Document>>> {
        self.docs
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write_lock(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<(String, String), Document>>> {
        self.docs
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn address(&self) -> &WorkspaceAddress {
        &self.address
    }

    async fn write(&self, doc: &Document) -> Result<WriteResult> {
        if let Err(e) = validate_document(doc, &self.address, now_micros()) {
            debug!(path = %doc.path, error = %e, "rejected document");
            return Ok(WriteResult::Rejected {
                reason: e.to_string(),
            });
        }

        let mut docs = self.write_lock()?;
        let key = (doc.path.clone(), doc.author.clone());

        if let Some(existing) = docs.get(&key) {
            if existing.timestamp >= doc.timestamp {
                return Ok(WriteResult::Ignored);
            }
        }

        docs.insert(key, doc.clone());
        Ok(WriteResult::Accepted)
    }

    async fn query(&self, filters: &SyncFilters, include_deleted: bool) -> Result<Vec<Document>> {
        let now = now_micros();
        let docs = self.read()?;
        Ok(filters
            .select(docs.values(), include_deleted)
            .into_iter()
            .filter(|d| !d.is_expired(now))
            .collect())
    }

    async fn get(&self, path: &str) -> Result<Option<Document>> {
        let now = now_micros();
        let docs = self.read()?;
        let versions = docs
            .range((path.to_string(), String::new())..)
            .take_while(|((p, _), _)| p == path)
            .map(|(_, d)| d)
            .filter(|d| !d.is_expired(now));
        Ok(newest(versions).cloned())
    }

    async fn get_by_author(&self, path: &str, author: &str) -> Result<Option<Document>> {
        let now = now_micros();
        let docs = self.read()?;
        Ok(docs
            .get(&(path.to_string(), author.to_string()))
            .filter(|d| !d.is_expired(now))
            .cloned())
    }

    async fn authors(&self) -> Result<Vec<String>> {
        let docs = self.read()?;
        let authors: BTreeSet<&String> = docs.keys().map(|(_, author)| author).collect();
        Ok(authors.into_iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubsync_core::{AuthorKeypair, DocumentBuilder};

    fn workspace() -> WorkspaceAddress {
        WorkspaceAddress::parse("+test.abc").unwrap()
    }

    fn doc(author: &AuthorKeypair, path: &str, content: &str, ts: i64) -> Document {
        DocumentBuilder::new(workspace(), path)
            .content(content)
            .timestamp(ts)
            .sign(author)
            .unwrap()
    }

    #[tokio::test]
    async fn test_write_if_newer() {
        let store = MemoryStore::new(workspace());
        let suzy = AuthorKeypair::from_seed("suzy", &[1; 32]).unwrap();
        let now = now_micros();

        let v1 = doc(&suzy, "/a", "one", now - 10);
        let v2 = doc(&suzy, "/a", "two", now - 5);

        assert_eq!(store.write(&v1).await.unwrap(), WriteResult::Accepted);
        assert_eq!(store.write(&v1).await.unwrap(), WriteResult::Ignored);
        assert_eq!(store.write(&v2).await.unwrap(), WriteResult::Accepted);
        assert_eq!(store.write(&v1).await.unwrap(), WriteResult::Ignored);

        let all = store.documents().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].content, "two");
    }

    #[tokio::test]
    async fn test_rejects_invalid() {
        let store = MemoryStore::new(workspace());
        let suzy = AuthorKeypair::from_seed("suzy", &[1; 32]).unwrap();
        let mut d = doc(&suzy, "/a", "one", now_micros());
        d.content = "tampered".into();

        match store.write(&d).await.unwrap() {
            WriteResult::Rejected { reason } => assert!(reason.contains("hash")),
            other => panic!("expected rejection, got {:?}", other),
        }
        assert!(store.documents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_returns_newest_across_authors() {
        let store = MemoryStore::new(workspace());
        let suzy = AuthorKeypair::from_seed("suzy", &[1; 32]).unwrap();
        let fred = AuthorKeypair::from_seed("fred", &[2; 32]).unwrap();
        let now = now_micros();

        store.write(&doc(&suzy, "/a", "suzy", now - 10)).await.unwrap();
        store.write(&doc(&fred, "/a", "fred", now - 5)).await.unwrap();
        store.write(&doc(&suzy, "/ab", "other", now)).await.unwrap();

        let canonical = store.get("/a").await.unwrap().unwrap();
        assert_eq!(canonical.content, "fred");
        assert_eq!(store.authors().await.unwrap().len(), 2);
        assert!(store.get("/missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_query_tombstones() {
        let store = MemoryStore::new(workspace());
        let suzy = AuthorKeypair::from_seed("suzy", &[1; 32]).unwrap();
        let now = now_micros();

        store.write(&doc(&suzy, "/d", "", now)).await.unwrap();
        store.write(&doc(&suzy, "/e", "x", now)).await.unwrap();

        let f = SyncFilters::unfiltered();
        assert_eq!(store.query(&f, false).await.unwrap().len(), 1);
        assert_eq!(store.query(&f, true).await.unwrap().len(), 2);
    }
}
