//! Response cache interface and the file-per-key disk backend
//!
//! ## Storage Layout
//!
//! ```text
//! <cache dir>/
//!   <sha256 of url>.html     # raw payload, mtime = staleness reference
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Corrupt cache entry for {key}: {message}")]
    Corrupt { key: String, message: String },
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Age-gated key/value store for fetched payloads
///
/// Entries are overwritten by `put` and never deleted; an entry older than the
/// caller's `max_age` is treated exactly like a missing one.
pub trait ResponseCache {
    /// Returns the payload for `key` if present and no older than `max_age`
    fn get(&self, key: &str, max_age: Duration) -> CacheResult<Option<String>>;

    /// Stores `payload` under `key`, stamped with the current time
    fn put(&mut self, key: &str, payload: &str) -> CacheResult<()>;
}

/// One file per key under a directory
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    /// Creates a cache rooted at `root`; the directory is created on first write
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Path of the file backing `key`
    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.html", key))
    }

    /// Age of the entry for `key`, if one exists
    pub fn age(&self, key: &str) -> CacheResult<Option<Duration>> {
        let metadata = match fs::metadata(self.entry_path(key)) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let modified = metadata.modified()?;
        // A modification time in the future counts as brand new.
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        Ok(Some(age))
    }
}

impl ResponseCache for DiskCache {
    fn get(&self, key: &str, max_age: Duration) -> CacheResult<Option<String>> {
        let Some(age) = self.age(key)? else {
            tracing::debug!(key, "Cache miss");
            return Ok(None);
        };

        if age > max_age {
            tracing::info!(
                key,
                age_secs = age.as_secs(),
                max_age_secs = max_age.as_secs(),
                "Cached page is stale, will re-fetch"
            );
            return Ok(None);
        }

        let payload = fs::read_to_string(self.entry_path(key))?;
        tracing::info!(key, age_secs = age.as_secs(), "Using cached page");
        Ok(Some(payload))
    }

    fn put(&mut self, key: &str, payload: &str) -> CacheResult<()> {
        fs::create_dir_all(&self.root)?;

        // Write to a temp file and rename so a crash never leaves half a page.
        let final_path = self.entry_path(key);
        let temp_path = self.root.join(format!(".{}.tmp", key));
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(payload.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &final_path)?;

        tracing::debug!(path = %final_path.display(), bytes = payload.len(), "Saved page to cache");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::cache_key;
    use tempfile::TempDir;

    fn backdate(cache: &DiskCache, key: &str, by: Duration) {
        let file = fs::File::options()
            .write(true)
            .open(cache.entry_path(key))
            .unwrap();
        file.set_modified(SystemTime::now() - by).unwrap();
    }

    #[test]
    fn test_put_then_get() {
        let temp = TempDir::new().unwrap();
        let mut cache = DiskCache::new(temp.path());
        let key = cache_key("https://fbref.com/schedule");

        cache.put(&key, "<html>Premier League</html>").unwrap();

        let hit = cache.get(&key, Duration::from_secs(60)).unwrap();
        assert_eq!(hit.as_deref(), Some("<html>Premier League</html>"));
    }

    #[test]
    fn test_missing_entry_is_none() {
        let temp = TempDir::new().unwrap();
        let cache = DiskCache::new(temp.path());

        let miss = cache.get("deadbeef", Duration::from_secs(60)).unwrap();
        assert!(miss.is_none());
    }

    #[test]
    fn test_stale_entry_is_none() {
        let temp = TempDir::new().unwrap();
        let mut cache = DiskCache::new(temp.path());

        cache.put("k", "payload").unwrap();
        backdate(&cache, "k", Duration::from_secs(7200));

        assert!(cache.get("k", Duration::from_secs(3600)).unwrap().is_none());
        assert!(cache.get("k", Duration::from_secs(10_000)).unwrap().is_some());
    }

    #[test]
    fn test_put_overwrites_and_refreshes() {
        let temp = TempDir::new().unwrap();
        let mut cache = DiskCache::new(temp.path());

        cache.put("k", "old").unwrap();
        backdate(&cache, "k", Duration::from_secs(7200));
        cache.put("k", "new").unwrap();

        let hit = cache.get("k", Duration::from_secs(3600)).unwrap();
        assert_eq!(hit.as_deref(), Some("new"));
    }

    #[test]
    fn test_put_creates_directory_and_file_layout() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("nested").join("cache");
        let mut cache = DiskCache::new(&root);
        let key = cache_key("https://fbref.com/");

        cache.put(&key, "x").unwrap();

        let expected = root.join(format!("{}.html", key));
        assert!(expected.is_file());
        assert_eq!(fs::read_to_string(expected).unwrap(), "x");
        // No temp files left behind
        assert_eq!(fs::read_dir(&root).unwrap().count(), 1);
    }

    #[test]
    fn test_survives_reopen() {
        let temp = TempDir::new().unwrap();
        DiskCache::new(temp.path()).put("k", "persisted").unwrap();

        let reopened = DiskCache::new(temp.path());
        let hit = reopened.get("k", Duration::from_secs(60)).unwrap();
        assert_eq!(hit.as_deref(), Some("persisted"));
    }

    #[test]
    fn test_put_fails_when_root_is_a_file() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let mut cache = DiskCache::new(&blocker);
        assert!(cache.put("k", "payload").is_err());
    }
}
