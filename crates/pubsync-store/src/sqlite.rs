//! SQLite implementation of the DocumentStore trait.
//!
//! One database file per workspace. Uses rusqlite with bundled SQLite,
//! wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::debug;

use pubsync_core::{now_micros, validate_document, Document, SyncFilters, WorkspaceAddress};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{newest, DocumentStore, WriteResult};

/// How long a connection waits on another connection's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const DOC_COLUMNS: &str =
    "format, workspace, path, author, content, content_hash, timestamp, delete_after, signature";

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    address: WorkspaceAddress,
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist. Fails if the
    /// file already holds a different workspace.
    pub fn open(path: impl AsRef<Path>, address: WorkspaceAddress) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn, address)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory(address: WorkspaceAddress) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, address)
    }

    fn init(mut conn: Connection, address: WorkspaceAddress) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        migration::migrate(&mut conn)?;

        // First opener claims the file; later ones only compare
        conn.execute(
            "INSERT OR IGNORE INTO workspace_meta (key, value) VALUES ('workspace', ?1)",
            params![address.as_str()],
        )?;
        let found: String = conn.query_row(
            "SELECT value FROM workspace_meta WHERE key = 'workspace'",
            [],
            |row| row.get(0),
        )?;
        if found != address.as_str() {
            return Err(StoreError::WorkspaceMismatch {
                expected: address.to_string(),
                found,
            });
        }

        Ok(Self {
            address,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<Document> {
    Ok(Document {
        format: row.get("format")?,
        workspace: row.get("workspace")?,
        path: row.get("path")?,
        author: row.get("author")?,
        content: row.get("content")?,
        content_hash: row.get("content_hash")?,
        timestamp: row.get("timestamp")?,
        delete_after: row.get("delete_after")?,
        signature: row.get("signature")?,
    })
}

/// Build the WHERE clause and arguments for a filtered read.
fn query_clause(filters: &SyncFilters, include_deleted: bool, now: i64) -> (String, Vec<Value>) {
    let mut sql = String::from("(delete_after IS NULL OR delete_after > ?)");
    let mut args = vec![Value::Integer(now)];

    if !include_deleted {
        sql.push_str(" AND content != ''");
    }

    if !filters.is_unfiltered() {
        let mut clauses = Vec::new();
        for author in &filters.versions_by_authors {
            clauses.push("author = ?");
            args.push(Value::Text(author.clone()));
        }
        for prefix in &filters.path_prefixes {
            clauses.push("substr(path, 1, ?) = ?");
            args.push(Value::Integer(prefix.chars().count() as i64));
            args.push(Value::Text(prefix.clone()));
        }
        sql.push_str(" AND (");
        sql.push_str(&clauses.join(" OR "));
        sql.push(')');
    }

    (sql, args)
}

#[async_trait]
impl DocumentStore for SqliteStore {
    fn address(&self) -> &WorkspaceAddress {
        &self.address
    }

    async fn write(&self, doc: &Document) -> Result<WriteResult> {
        let now = now_micros();
        if let Err(e) = validate_document(doc, &self.address, now) {
            debug!(path = %doc.path, error = %e, "rejected document");
            return Ok(WriteResult::Rejected {
                reason: e.to_string(),
            });
        }

        let doc = doc.clone();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;

            let existing: Option<i64> = tx
                .query_row(
                    "SELECT timestamp FROM docs WHERE path = ?1 AND author = ?2",
                    params![doc.path, doc.author],
                    |row| row.get(0),
                )
                .optional()?;

            if matches!(existing, Some(ts) if ts >= doc.timestamp) {
                return Ok(WriteResult::Ignored);
            }

            tx.execute(
                "INSERT OR REPLACE INTO docs (
                    format, workspace, path, author, content, content_hash,
                    timestamp, delete_after, signature, ingested_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    doc.format,
                    doc.workspace,
                    doc.path,
                    doc.author,
                    doc.content,
                    doc.content_hash,
                    doc.timestamp,
                    doc.delete_after,
                    doc.signature,
                    now,
                ],
            )?;
            tx.commit()?;

            Ok(WriteResult::Accepted)
        })
        .await
    }

    async fn query(&self, filters: &SyncFilters, include_deleted: bool) -> Result<Vec<Document>> {
        let (clause, args) = query_clause(filters, include_deleted, now_micros());
        self.blocking(move |conn| {
            let sql = format!(
                "SELECT {} FROM docs WHERE {} ORDER BY path, author",
                DOC_COLUMNS, clause
            );
            let mut stmt = conn.prepare(&sql)?;
            let docs = stmt
                .query_map(params_from_iter(args.iter()), row_to_document)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(docs)
        })
        .await
    }

    async fn get(&self, path: &str) -> Result<Option<Document>> {
        let path = path.to_string();
        let now = now_micros();
        self.blocking(move |conn| {
            let sql = format!(
                "SELECT {} FROM docs
                 WHERE path = ?1 AND (delete_after IS NULL OR delete_after > ?2)",
                DOC_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let versions = stmt
                .query_map(params![path, now], row_to_document)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(newest(&versions).cloned())
        })
        .await
    }

    async fn get_by_author(&self, path: &str, author: &str) -> Result<Option<Document>> {
        let path = path.to_string();
        let author = author.to_string();
        let now = now_micros();
        self.blocking(move |conn| {
            let sql = format!(
                "SELECT {} FROM docs
                 WHERE path = ?1 AND author = ?2
                   AND (delete_after IS NULL OR delete_after > ?3)",
                DOC_COLUMNS
            );
            Ok(conn
                .query_row(&sql, params![path, author, now], row_to_document)
                .optional()?)
        })
        .await
    }

    async fn authors(&self) -> Result<Vec<String>> {
        self.blocking(|conn| {
            let mut stmt = conn.prepare("SELECT DISTINCT author FROM docs ORDER BY author")?;
            let authors = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(authors)
        })
        .await
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
    async fn test_write_and_read_back() {
        let store = SqliteStore::open_memory(workspace()).unwrap();
        let suzy = AuthorKeypair::from_seed("suzy", &[1; 32]).unwrap();
        let d = doc(&suzy, "/a", "hello", now_micros());

        assert_eq!(store.write(&d).await.unwrap(), WriteResult::Accepted);
        assert_eq!(store.write(&d).await.unwrap(), WriteResult::Ignored);

        let back = store.get("/a").await.unwrap().unwrap();
        assert_eq!(back, d);
        assert_eq!(
            store.get_by_author("/a", &d.author).await.unwrap(),
            Some(d.clone())
        );
        assert_eq!(store.authors().await.unwrap(), vec![d.author.clone()]);
    }

    #[tokio::test]
    async fn test_newer_version_replaces() {
        let store = SqliteStore::open_memory(workspace()).unwrap();
        let suzy = AuthorKeypair::from_seed("suzy", &[1; 32]).unwrap();
        let now = now_micros();

        store.write(&doc(&suzy, "/a", "one", now - 10)).await.unwrap();
        store.write(&doc(&suzy, "/a", "two", now - 5)).await.unwrap();
        assert_eq!(
            store.write(&doc(&suzy, "/a", "old", now - 20)).await.unwrap(),
            WriteResult::Ignored
        );

        let all = store.documents().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].content, "two");
    }

    #[tokio::test]
    async fn test_query_filters() {
        let store = SqliteStore::open_memory(workspace()).unwrap();
        let suzy = AuthorKeypair::from_seed("suzy", &[1; 32]).unwrap();
        let fred = AuthorKeypair::from_seed("fred", &[2; 32]).unwrap();
        let now = now_micros();

        store.write(&doc(&suzy, "/x/1", "a", now)).await.unwrap();
        store.write(&doc(&suzy, "/y/1", "b", now)).await.unwrap();
        store.write(&doc(&fred, "/z/1", "c", now)).await.unwrap();
        store.write(&doc(&suzy, "/x/gone", "", now)).await.unwrap();

        let by_prefix = SyncFilters::default().with_path_prefix("/x");
        let paths: Vec<String> = store
            .query(&by_prefix, false)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.path)
            .collect();
        assert_eq!(paths, vec!["/x/1"]);
        assert_eq!(store.query(&by_prefix, true).await.unwrap().len(), 2);

        let union = SyncFilters::default()
            .with_path_prefix("/x")
            .with_author(fred.address().to_string());
        assert_eq!(store.query(&union, false).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_reopen_persists_and_checks_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ws.sqlite");
        let suzy = AuthorKeypair::from_seed("suzy", &[1; 32]).unwrap();

        {
            let store = SqliteStore::open(&path, workspace()).unwrap();
            store
                .write(&doc(&suzy, "/a", "kept", now_micros()))
                .await
                .unwrap();
        }

        let store = SqliteStore::open(&path, workspace()).unwrap();
        assert_eq!(store.documents().await.unwrap().len(), 1);

        let other = WorkspaceAddress::parse("+other.abc").unwrap();
        assert!(matches!(
            SqliteStore::open(&path, other),
            Err(StoreError::WorkspaceMismatch { .. })
        ));
    }

    #[test]
    fn test_concurrent_open_of_fresh_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ws.sqlite");
        let barrier = Arc::new(std::sync::Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let path = path.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    SqliteStore::open(path, workspace()).map(|_| ())
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let conn = Connection::open(&path).unwrap();
        let versions: u32 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(versions, migration::CURRENT_VERSION);
    }
}
