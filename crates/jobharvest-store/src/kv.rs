//! Key/value backends for the result buffer.

use crate::error::{Result, StoreError};
use crate::settings;
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// JSON key/value storage.
#[async_trait::async_trait]
pub trait KvStore: Send + Sync {
    /// Read a value.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Write a value. Fails with [`StoreError::QuotaExceeded`] when the
    /// backend has no room for it.
    async fn set(&self, key: &str, value: &Value) -> Result<()>;

    /// Remove a value.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// [`KvStore`] on the `SQLite` `settings` table.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Wrap a pool whose migrations have been applied.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl KvStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        settings::get_setting(&self.pool, key).await
    }

    async fn set(&self, key: &str, value: &Value) -> Result<()> {
        settings::set_setting(&self.pool, key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        settings::delete_setting(&self.pool, key).await
    }
}

/// In-process [`KvStore`] with an optional quota on the total serialized size
/// of all values.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    /// Unbounded store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store refusing writes that would take the total serialized size of
    /// all values above `quota_bytes`.
    #[must_use]
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        self.values
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Total serialized size of the stored values.
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.lock().values().map(|v| v.to_string().len()).sum()
    }
}

#[async_trait::async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &Value) -> Result<()> {
        let mut values = self.lock();
        if let Some(quota) = self.quota_bytes {
            let others: usize = values
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(_, v)| v.to_string().len())
                .sum();
            if others + value.to_string().len() > quota {
                return Err(StoreError::QuotaExceeded);
            }
        }
        values.insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }
}
