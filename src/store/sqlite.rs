//! SQLite-backed [`KvStore`].

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::StoreConfig;

/// Schema version recorded in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 1;

/// The single table holding every entry.
pub const TABLE_NAME: &str = "key_value_store";

/// Storage failure. Distinct from a missing key, which is `Ok(None)`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open store at {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store transaction failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("value could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("value under key {key:?} is not an integer")]
    NotANumber { key: String },
}

struct Inner {
    path: PathBuf,
    busy_timeout: Duration,
    schema_ready: AtomicBool,
}

/// Asynchronous key-value store persisted to a local SQLite file.
///
/// Cloning is cheap; clones share the same file.
#[derive(Clone)]
pub struct KvStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for KvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvStore")
            .field("path", &self.inner.path)
            .finish_non_exhaustive()
    }
}

impl KvStore {
    /// Create a store handle. No I/O happens until the first operation.
    pub fn new(config: &StoreConfig) -> Self {
        Self::open(&config.path, Duration::from_millis(config.busy_timeout_ms))
    }

    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                path: path.as_ref().to_path_buf(),
                busy_timeout,
                schema_ready: AtomicBool::new(false),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Read a value. A missing key resolves to `None`.
    pub async fn get<T>(&self, key: &str) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        let key = key.to_string();
        let raw = self
            .run(move |conn| {
                let value = conn
                    .query_row(
                        &format!("SELECT value FROM {TABLE_NAME} WHERE key = ?1"),
                        params![key],
                        |row| row.get::<_, String>(0),
                    )
                    .optional()?;
                Ok(value)
            })
            .await?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Write a value, replacing any previous value for `key`.
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), StoreError>
    where
        T: Serialize + ?Sized,
    {
        let key = key.to_string();
        let json = serde_json::to_string(value)?;
        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                &format!(
                    "INSERT INTO {TABLE_NAME} (key, value) VALUES (?1, ?2) \
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value"
                ),
                params![key, json],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Delete `key`. Removing a missing key succeeds.
    pub async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                &format!("DELETE FROM {TABLE_NAME} WHERE key = ?1"),
                params![key],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Add `by` to the integer stored under `key` (missing counts as 0) and
    /// return the new value. Read and write share one transaction.
    pub async fn increment(&self, key: &str, by: i64) -> Result<i64, StoreError> {
        let key = key.to_string();
        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let current: Option<String> = tx
                .query_row(
                    &format!("SELECT value FROM {TABLE_NAME} WHERE key = ?1"),
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;

            let current = match current {
                Some(json) => serde_json::from_str::<serde_json::Value>(&json)?
                    .as_i64()
                    .ok_or_else(|| StoreError::NotANumber { key: key.clone() })?,
                None => 0,
            };
            let next = current.saturating_add(by);

            tx.execute(
                &format!(
                    "INSERT INTO {TABLE_NAME} (key, value) VALUES (?1, ?2) \
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value"
                ),
                params![key, next.to_string()],
            )?;
            tx.commit()?;
            Ok(next)
        })
        .await
    }

    /// Every entry, ordered by key.
    pub async fn entries(&self) -> Result<Vec<(String, serde_json::Value)>, StoreError> {
        let rows = self
            .run(|conn| {
                let mut stmt =
                    conn.prepare(&format!("SELECT key, value FROM {TABLE_NAME} ORDER BY key"))?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        rows.into_iter()
            .map(|(key, json)| Ok::<_, StoreError>((key, serde_json::from_str(&json)?)))
            .collect()
    }

    /// Run `op` on a freshly opened connection on the blocking pool.
    async fn run<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut conn = inner.connect()?;
            op(&mut conn)
        })
        .await?
    }
}

impl Inner {
    fn connect(&self) -> Result<Connection, StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut conn = Connection::open(&self.path).map_err(|source| StoreError::Open {
            path: self.path.clone(),
            source,
        })?;
        conn.busy_timeout(self.busy_timeout)?;

        if !self.schema_ready.load(Ordering::Acquire) {
            migrate(&mut conn)?;
            self.schema_ready.store(true, Ordering::Release);
        }
        Ok(conn)
    }
}

/// Create the table when the file's schema version is older than [`SCHEMA_VERSION`].
fn migrate(conn: &mut Connection) -> Result<(), StoreError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let version: i64 = tx.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if version < SCHEMA_VERSION {
        tx.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {TABLE_NAME} (
                key   TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            );"
        ))?;
        tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        tracing::info!(from = version, to = SCHEMA_VERSION, "Store schema upgraded");
    }
    tx.commit()?;
    Ok(())
}
