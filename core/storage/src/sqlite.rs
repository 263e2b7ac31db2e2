//! SQLite-backed key-value store.
//!
//! One table per bucket, created idempotently on open. Values are JSON text.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::provider::KeyValueStore;
use jamtalk_common::{Bucket, Error, Result};

/// Current schema version, tracked in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 1;

/// SQLite key-value store.
///
/// The connection is shared behind a mutex so each operation runs as a single
/// statement on the blocking thread pool. `None` marks a closed store.
pub struct SqliteStore {
    conn: Arc<Mutex<Option<Connection>>>,
}

fn table(bucket: Bucket) -> String {
    format!("bucket_{}", bucket.as_str())
}

fn sql_err(e: rusqlite::Error) -> Error {
    Error::Storage(e.to_string())
}

impl SqliteStore {
    /// Create or open a store database.
    ///
    /// # Postconditions
    /// - Every bucket table exists
    /// - `user_version` equals `SCHEMA_VERSION`
    ///
    /// # Errors
    /// - `StoreUnavailable` if the database cannot be opened or migrated
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref())
            .map_err(|e| Error::StoreUnavailable(format!("Cannot open database: {}", e)))?;

        Self::initialize(&conn)?;

        info!(path = %db_path.as_ref().display(), "Key-value store opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
        })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    fn initialize(conn: &Connection) -> Result<()> {
        let unavailable =
            |e: rusqlite::Error| Error::StoreUnavailable(format!("Schema initialization failed: {}", e));

        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .map_err(unavailable)?;
        if version > SCHEMA_VERSION {
            return Err(Error::StoreUnavailable(format!(
                "Database schema version {} is newer than supported {}",
                version, SCHEMA_VERSION
            )));
        }

        let mut ddl = String::new();
        for bucket in Bucket::ALL {
            ddl.push_str(&format!(
                "CREATE TABLE IF NOT EXISTS {} (key TEXT PRIMARY KEY, value TEXT NOT NULL);\n",
                table(bucket)
            ));
        }
        ddl.push_str(&format!("PRAGMA user_version = {};", SCHEMA_VERSION));
        conn.execute_batch(&ddl).map_err(unavailable)?;

        if version < SCHEMA_VERSION {
            debug!(from = version, to = SCHEMA_VERSION, "Migrated schema");
        }
        Ok(())
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| Error::Storage("Connection lock poisoned".to_string()))?;
            let conn = guard
                .as_ref()
                .ok_or_else(|| Error::StoreUnavailable("Store is closed".to_string()))?;
            f(conn).map_err(sql_err)
        })
        .await
        .map_err(|e| Error::Storage(format!("Blocking task failed: {}", e)))?
    }
}

fn parse_value(text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(|e| Error::Storage(format!("Corrupt stored value: {}", e)))
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn put(&self, bucket: Bucket, key: &str, value: Value) -> Result<()> {
        debug!(bucket = %bucket, key, "Upserting record");
        let text = serde_json::to_string(&value)?;
        let key = key.to_string();
        let sql = format!(
            "INSERT OR REPLACE INTO {} (key, value) VALUES (?1, ?2)",
            table(bucket)
        );
        self.with_conn(move |conn| conn.execute(&sql, params![key, text]).map(|_| ()))
            .await
    }

    async fn put_if_absent(&self, bucket: Bucket, key: &str, value: Value) -> Result<bool> {
        let text = serde_json::to_string(&value)?;
        let key = key.to_string();
        let sql = format!(
            "INSERT INTO {} (key, value) VALUES (?1, ?2) ON CONFLICT(key) DO NOTHING",
            table(bucket)
        );
        let inserted = self
            .with_conn(move |conn| conn.execute(&sql, params![key, text]))
            .await?;
        Ok(inserted == 1)
    }

    async fn get(&self, bucket: Bucket, key: &str) -> Result<Option<Value>> {
        let key = key.to_string();
        let sql = format!("SELECT value FROM {} WHERE key = ?1", table(bucket));
        let text: Option<String> = self
            .with_conn(move |conn| {
                conn.query_row(&sql, params![key], |row| row.get(0))
                    .optional()
            })
            .await?;

        text.as_deref().map(parse_value).transpose()
    }

    async fn get_all(&self, bucket: Bucket) -> Result<Vec<Value>> {
        let sql = format!("SELECT value FROM {}", table(bucket));
        let rows: Vec<String> = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                let values: rusqlite::Result<Vec<String>> = rows.collect();
                values
            })
            .await?;

        rows.iter().map(|text| parse_value(text)).collect()
    }

    async fn delete(&self, bucket: Bucket, key: &str) -> Result<()> {
        debug!(bucket = %bucket, key, "Deleting record");
        let key = key.to_string();
        let sql = format!("DELETE FROM {} WHERE key = ?1", table(bucket));
        self.with_conn(move |conn| conn.execute(&sql, params![key]).map(|_| ()))
            .await
    }

    async fn clear(&self, bucket: Bucket) -> Result<()> {
        info!(bucket = %bucket, "Clearing bucket");
        let sql = format!("DELETE FROM {}", table(bucket));
        self.with_conn(move |conn| conn.execute(&sql, []).map(|_| ()))
            .await
    }

    async fn count(&self, bucket: Bucket) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table(bucket));
        let count: i64 = self
            .with_conn(move |conn| conn.query_row(&sql, [], |row| row.get(0)))
            .await?;
        Ok(count as u64)
    }

    async fn close(&self) -> Result<()> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| Error::Storage("Connection lock poisoned".to_string()))?;
            match guard.take() {
                Some(conn) => conn.close().map_err(|(_, e)| sql_err(e)),
                None => Ok(()),
            }
        })
        .await
        .map_err(|e| Error::Storage(format!("Blocking task failed: {}", e)))??;

        info!("Key-value store closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_store_operations() {
        let store = SqliteStore::in_memory().unwrap();

        store
            .put(Bucket::Settings, "voice_preference", json!("Puck"))
            .await
            .unwrap();
        let value = store.get(Bucket::Settings, "voice_preference").await.unwrap();
        assert_eq!(value, Some(json!("Puck")));

        store.delete(Bucket::Settings, "voice_preference").await.unwrap();
        assert!(store
            .get(Bucket::Settings, "voice_preference")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = SqliteStore::in_memory().unwrap();
        store.put(Bucket::Profile, "user_session", json!({"name": "Ann"})).await.unwrap();
        store.put(Bucket::Profile, "user_session", json!({"name": "Bo"})).await.unwrap();

        let value = store.get(Bucket::Profile, "user_session").await.unwrap();
        assert_eq!(value, Some(json!({"name": "Bo"})));
        assert_eq!(store.count(Bucket::Profile).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_put_if_absent_keeps_first_value() {
        let store = SqliteStore::in_memory().unwrap();
        let first = json!({"salt": "a1b2c3d4e5f60708a1b2c3d4e5f60708"});

        assert!(store.put_if_absent(Bucket::VaultMeta, "config", first.clone()).await.unwrap());
        assert!(!store
            .put_if_absent(Bucket::VaultMeta, "config", json!({"salt": "00"}))
            .await
            .unwrap());

        let value = store.get(Bucket::VaultMeta, "config").await.unwrap();
        assert_eq!(value, Some(first));
        assert_eq!(store.count(Bucket::VaultMeta).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_all_and_idempotent_clear() {
        let store = SqliteStore::in_memory().unwrap();
        store.put(Bucket::History, "m1", json!({"text": "hola"})).await.unwrap();
        store.put(Bucket::History, "m2", json!({"text": "adios"})).await.unwrap();
        store.put(Bucket::Lessons, "completed_list", json!([])).await.unwrap();

        assert_eq!(store.get_all(Bucket::History).await.unwrap().len(), 2);

        store.clear(Bucket::History).await.unwrap();
        store.clear(Bucket::History).await.unwrap();
        assert!(store.get_all(Bucket::History).await.unwrap().is_empty());
        assert_eq!(store.count(Bucket::Lessons).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reopen_persists_and_schema_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.put(Bucket::Lessons, "completed_list", json!(["l1"])).await.unwrap();
            store.close().await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let value = store.get(Bucket::Lessons, "completed_list").await.unwrap();
        assert_eq!(value, Some(json!(["l1"])));
    }

    #[tokio::test]
    async fn test_open_invalid_path_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("nested").join("vault.db");

        assert!(matches!(
            SqliteStore::open(&path),
            Err(Error::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_closed_store_unavailable() {
        let store = SqliteStore::in_memory().unwrap();
        store.close().await.unwrap();
        store.close().await.unwrap();

        let result = store.put(Bucket::Settings, "k", json!(1)).await;
        assert!(matches!(result, Err(Error::StoreUnavailable(_))));
    }
}
