use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};

use super::CacheStore;
use crate::error::StoreError;

/// Stores payloads in a two-column `(key, value)` SQLite table.
///
/// Queries run on the blocking thread pool so they never stall the async
/// runtime.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a store at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Database(format!("failed to create {}: {e}", parent.display())))?;
        }
        let conn = Connection::open(path)
            .map_err(|e| StoreError::Database(format!("failed to open cache database: {e}")))?;
        Self::with_connection(conn)
    }

    /// Open an in-memory store.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Database(format!("failed to open in-memory database: {e}")))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS imagify (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL
            );",
        )
        .map_err(|e| StoreError::Database(format!("failed to init cache schema: {e}")))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `op` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| StoreError::Database("connection mutex poisoned".to_string()))?;
            op(&conn).map_err(|e| StoreError::Database(e.to_string()))
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl CacheStore for SqliteStore {
    async fn read(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        let key = key.to_string();
        let value: Option<Vec<u8>> = self
            .with_conn(move |conn| {
                conn.query_row(
                    "SELECT value FROM imagify WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()
            })
            .await?;
        Ok(value.map(Bytes::from))
    }

    async fn write(&self, key: &str, value: Bytes) -> Result<(), StoreError> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO imagify (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, &value[..]],
            )
            .map(|_| ())
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM imagify WHERE key = ?1", params![key])
                .map(|_| ())
        })
        .await
    }

    async fn purge(&self) -> Result<usize, StoreError> {
        self.with_conn(|conn| conn.execute("DELETE FROM imagify", [])).await
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
