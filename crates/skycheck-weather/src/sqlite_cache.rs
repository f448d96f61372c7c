//! SQLite-backed weather cache, so entries survive restarts.

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;

use crate::cache::{CacheBackend, CacheEntry, CacheError};

/// SQLite cache for weather responses.
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    /// Open (or create) a cache at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, CacheError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    tracing::warn!("Failed to create cache directory {}: {}", parent.display(), e);
                }
            }
        }
        Self::from_connection(Connection::open(path)?)
    }

    /// Create an in-memory cache.
    pub fn in_memory() -> Result<Self, CacheError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, CacheError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS weather_cache (
                key TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                expires_at_ms INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl CacheBackend for SqliteCache {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let row: Option<(String, i64)> = self
            .conn
            .lock()
            .query_row(
                "SELECT data, expires_at_ms FROM weather_cache WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((data, expires_at_ms)) = row else {
            return Ok(None);
        };

        // An out-of-range timestamp can only come from a foreign writer; treat it as long expired.
        let expires_at = Utc
            .timestamp_millis_opt(expires_at_ms)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        Ok(Some(CacheEntry {
            data: serde_json::from_str(&data)?,
            expires_at,
        }))
    }

    fn set(&self, key: &str, data: &Value, expires_at: DateTime<Utc>) -> Result<(), CacheError> {
        let json = serde_json::to_string(data)?;
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO weather_cache (key, data, expires_at_ms) VALUES (?1, ?2, ?3)",
            params![key, json, expires_at.timestamp_millis()],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.conn
            .lock()
            .execute("DELETE FROM weather_cache WHERE key = ?1", params![key])?;
        Ok(())
    }
}
