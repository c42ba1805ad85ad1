//! SQLite response cache backend
//!
//! Keeps every cached page as a row in a single table, for setups that prefer
//! one database file over a directory of pages.

use crate::fetch::cache::{CacheError, CacheResult, ResponseCache};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;

/// SQL schema for the cache database
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    key TEXT PRIMARY KEY NOT NULL,
    payload TEXT NOT NULL,
    stored_at TEXT NOT NULL
);
"#;

/// SQLite cache backend
pub struct SqliteCache {
    conn: Connection,
}

impl SqliteCache {
    /// Opens or creates the cache database at `path`
    pub fn new(path: &Path) -> CacheResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;
        conn.execute_batch(SCHEMA_SQL)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    /// Loads the raw entry without any freshness check
    fn load(&self, key: &str) -> CacheResult<Option<(String, DateTime<Utc>)>> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT payload, stored_at FROM cache_entries WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((payload, stored_at)) = row else {
            return Ok(None);
        };

        let stored_at = DateTime::parse_from_rfc3339(&stored_at)
            .map_err(|e| CacheError::Corrupt {
                key: key.to_string(),
                message: format!("bad stored_at '{}': {}", stored_at, e),
            })?
            .with_timezone(&Utc);

        Ok(Some((payload, stored_at)))
    }

    /// Rewrites the timestamp of an entry (for testing staleness)
    #[cfg(test)]
    fn set_stored_at(&mut self, key: &str, stored_at: DateTime<Utc>) -> CacheResult<()> {
        self.conn.execute(
            "UPDATE cache_entries SET stored_at = ?1 WHERE key = ?2",
            params![stored_at.to_rfc3339(), key],
        )?;
        Ok(())
    }
}

impl ResponseCache for SqliteCache {
    fn get(&self, key: &str, max_age: Duration) -> CacheResult<Option<String>> {
        let Some((payload, stored_at)) = self.load(key)? else {
            tracing::debug!(key, "Cache miss");
            return Ok(None);
        };

        let age = (Utc::now() - stored_at).to_std().unwrap_or(Duration::ZERO);
        if age > max_age {
            tracing::info!(
                key,
                age_secs = age.as_secs(),
                max_age_secs = max_age.as_secs(),
                "Cached page is stale, will re-fetch"
            );
            return Ok(None);
        }

        tracing::info!(key, age_secs = age.as_secs(), "Using cached page");
        Ok(Some(payload))
    }

    fn put(&mut self, key: &str, payload: &str) -> CacheResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO cache_entries (key, payload, stored_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET payload = excluded.payload, stored_at = excluded.stored_at",
            params![key, payload, now],
        )?;
        tracing::debug!(key, bytes = payload.len(), "Saved page to cache");
        Ok(())
    }
}
