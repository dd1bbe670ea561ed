//! Local key-value persistence
//!
//! All durable shared state (quota counter, license shadow cache) lives
//! behind the [`KeyValueStore`] trait as flat JSON values. The store is
//! shared across every context of the same installation but offers no
//! transactions; read-modify-write callers accept lost updates.

use async_trait::async_trait;
use page_media_core::StorageError;
use rusqlite::OptionalExtension;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use tokio_rusqlite::Connection;
use tracing::debug;

/// Well-known keys of the persisted entries
pub mod keys {
    /// Calendar day the quota counter applies to, local `YYYY-MM-DD`
    pub const QUOTA_DATE: &str = "quotaDate";
    /// Charged downloads on that day
    pub const QUOTA_COUNT: &str = "quotaCount";
    /// Shadow cache: last observed paid flag
    pub const LICENSE_PAID: &str = "licensePaid";
    /// Shadow cache: when the paid flag was last observed, epoch millis
    pub const LICENSE_UPDATED_AT: &str = "licenseUpdatedAt";
}

/// Flat JSON key-value persistence shared across contexts
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory store used by tests and ephemeral sessions
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryKeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// SQLite-backed store for durable installations
pub struct SqliteKeyValueStore {
    conn: Connection,
}

impl SqliteKeyValueStore {
    /// Open (and initialize) the store at the given path
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path.as_ref())
            .await
            .map_err(|e| StorageError::Unavailable { reason: e.to_string() })?;
        Self::initialize(conn).await
    }

    /// Open an in-memory store (one connection, not shared)
    pub async fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| StorageError::Unavailable { reason: e.to_string() })?;
        Self::initialize(conn).await
    }

    async fn initialize(conn: Connection) -> Result<Self, StorageError> {
        conn.call(|conn| {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS kv_entries (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                )",
                [],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| StorageError::Unavailable { reason: e.to_string() })?;
        debug!("key-value store initialized");
        Ok(Self { conn })
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let key_owned = key.to_string();
        let raw: Option<String> = self
            .conn
            .call(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT value FROM kv_entries WHERE key = ?1",
                        [&key_owned],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(row)
            })
            .await
            .map_err(|e| StorageError::ReadFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        match raw {
            Some(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|_| StorageError::DecodeFailed { key: key.to_string() }),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let key_owned = key.to_string();
        let text = value.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO kv_entries (key, value) VALUES (?1, ?2)",
                    [&key_owned, &text],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| StorageError::WriteFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let key_owned = key.to_string();
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM kv_entries WHERE key = ?1", [&key_owned])?;
                Ok(())
            })
            .await
            .map_err(|e| StorageError::WriteFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn memory_store_round_trips_values() {
        let store = MemoryKeyValueStore::new();
        assert_eq!(store.get(keys::QUOTA_COUNT).await.unwrap(), None);

        store.set(keys::QUOTA_COUNT, json!(3)).await.unwrap();
        assert_eq!(store.get(keys::QUOTA_COUNT).await.unwrap(), Some(json!(3)));

        store.remove(keys::QUOTA_COUNT).await.unwrap();
        assert_eq!(store.get(keys::QUOTA_COUNT).await.unwrap(), None);
    }

    #[tokio::test]
    async fn sqlite_store_round_trips_values() {
        let store = SqliteKeyValueStore::open_in_memory().await.unwrap();

        store.set(keys::QUOTA_DATE, json!("2026-08-07")).await.unwrap();
        store.set(keys::LICENSE_PAID, json!(true)).await.unwrap();

        assert_eq!(
            store.get(keys::QUOTA_DATE).await.unwrap(),
            Some(json!("2026-08-07"))
        );
        assert_eq!(store.get(keys::LICENSE_PAID).await.unwrap(), Some(json!(true)));

        store.set(keys::LICENSE_PAID, json!(false)).await.unwrap();
        assert_eq!(store.get(keys::LICENSE_PAID).await.unwrap(), Some(json!(false)));
    }

    #[tokio::test]
    async fn sqlite_store_returns_none_for_missing_keys() {
        let store = SqliteKeyValueStore::open_in_memory().await.unwrap();
        assert_eq!(store.get("nope").await.unwrap(), None);
    }
}
