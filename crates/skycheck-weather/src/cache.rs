//! Cache backends for weather responses.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A cached response and the moment it stops being valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: Value,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Expired only once `expires_at` is strictly before `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Key/value store with per-entry expiry.
///
/// Each call must be atomic on its own. Expiry is not enforced by the
/// backend; callers compare `expires_at` themselves.
pub trait CacheBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;
    fn set(&self, key: &str, data: &Value, expires_at: DateTime<Utc>) -> Result<(), CacheError>;
    fn delete(&self, key: &str) -> Result<(), CacheError>;
}

impl<T: CacheBackend + ?Sized> CacheBackend for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, data: &Value, expires_at: DateTime<Utc>) -> Result<(), CacheError> {
        (**self).set(key, data, expires_at)
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        (**self).delete(key)
    }
}

/// Process-local cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl CacheBackend for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, data: &Value, expires_at: DateTime<Utc>) -> Result<(), CacheError> {
        self.entries.lock().insert(
            key.to_string(),
            CacheEntry {
                data: data.clone(),
                expires_at,
            },
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}
