use crate::cache::CacheStore;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Builder, Connection, Database};
use serde_json::Value;
use std::path::Path;

/// Cache store backed by a single libsql table.
///
/// Values are stored as JSON text; `written_at` is a unix timestamp in
/// milliseconds.
pub struct LibsqlStore {
    // Keeps the database alive for as long as the connection is in use.
    _db: Database,
    conn: Connection,
}

impl LibsqlStore {
    /// Open (or create) a database file at `path`.
    pub async fn new_local(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Database(format!(
                    "Failed to create cache directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to open cache database: {}", e)))?;

        Self::from_database(db).await
    }

    /// Open a private in-memory database. Nothing survives the process.
    pub async fn new_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to open memory database: {}", e)))?;

        Self::from_database(db).await
    }

    async fn from_database(db: Database) -> Result<Self> {
        let conn = db
            .connect()
            .map_err(|e| AppError::Database(format!("Failed to get connection: {}", e)))?;

        let store = Self { _db: db, conn };
        store.initialize_schema().await?;

        Ok(store)
    }

    async fn initialize_schema(&self) -> Result<()> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS cache_entries (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    written_at INTEGER NOT NULL
                )",
                (),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to create cache_entries table: {}", e)))?;

        Ok(())
    }

    /// Number of persisted entries
    pub async fn count(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM cache_entries", ())
            .await
            .map_err(|e| AppError::Database(format!("Failed to count cache entries: {}", e)))?;

        match rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            Some(row) => {
                let count: i64 = row.get(0).map_err(|e| AppError::Database(e.to_string()))?;
                Ok(count.max(0) as u64)
            }
            None => Ok(0),
        }
    }

    /// When the entry under `key` was last written, if present
    pub async fn written_at(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        let mut rows = self
            .conn
            .query("SELECT written_at FROM cache_entries WHERE key = ?", [key])
            .await
            .map_err(|e| AppError::Database(format!("Failed to query cache entry: {}", e)))?;

        match rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            Some(row) => {
                let millis: i64 = row.get(0).map_err(|e| AppError::Database(e.to_string()))?;
                Ok(DateTime::from_timestamp_millis(millis))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl CacheStore for LibsqlStore {
    async fn load(&self, key: &str) -> Result<Option<Value>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM cache_entries WHERE key = ?", [key])
            .await
            .map_err(|e| AppError::Database(format!("Failed to query cache entry: {}", e)))?;

        let Some(row) = rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        let text: String = row.get(0).map_err(|e| AppError::Database(e.to_string()))?;
        let value = serde_json::from_str(&text).map_err(|e| {
            AppError::Database(format!("Corrupt cache entry for key {}: {}", key, e))
        })?;

        Ok(Some(value))
    }

    async fn store(&self, key: &str, value: &Value, written_at: DateTime<Utc>) -> Result<()> {
        let text = serde_json::to_string(value)
            .map_err(|e| AppError::Internal(format!("Failed to serialize cache value: {}", e)))?;

        self.conn
            .execute(
                "INSERT OR REPLACE INTO cache_entries (key, value, written_at) VALUES (?, ?, ?)",
                (key, text.as_str(), written_at.timestamp_millis()),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to write cache entry: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = LibsqlStore::new_memory().await.expect("open memory db");

        assert!(store.load("missing").await.unwrap().is_none());

        let now = Utc::now();
        store
            .store("k", &json!({"keywords": ["a", "b"]}), now)
            .await
            .unwrap();

        assert_eq!(
            store.load("k").await.unwrap(),
            Some(json!({"keywords": ["a", "b"]}))
        );
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(
            store.written_at("k").await.unwrap().map(|t| t.timestamp_millis()),
            Some(now.timestamp_millis())
        );
    }

    #[tokio::test]
    async fn test_store_replaces_existing_key() {
        let store = LibsqlStore::new_memory().await.unwrap();
        store.store("k", &json!(1), Utc::now()).await.unwrap();
        store.store("k", &json!(2), Utc::now()).await.unwrap();

        assert_eq!(store.load("k").await.unwrap(), Some(json!(2)));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_local_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.db");

        {
            let store = LibsqlStore::new_local(&path).await.unwrap();
            store.store("page", &json!("text"), Utc::now()).await.unwrap();
        }

        let reopened = LibsqlStore::new_local(&path).await.unwrap();
        assert_eq!(reopened.load("page").await.unwrap(), Some(json!("text")));
    }
}
