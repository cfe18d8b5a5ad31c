//! Persisted hash store backing the cooldown gate.
//!
//! The store owns atomicity: `add` is a test-and-set, so two concurrent
//! jobs for the same (category, query) cannot both win the slot.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::warn;

/// Expiring hash set shared by all doublefetch jobs.
pub trait PersistedHashes: Send + Sync {
    /// Insert a hash with an expiry. Returns true iff the hash was newly
    /// inserted (not already present and unexpired).
    fn add(&self, hash: &str, expire_at: DateTime<Utc>) -> bool;

    /// Remove a hash, releasing its slot immediately.
    fn delete(&self, hash: &str);
}

/// In-memory store. Suitable for embedders that persist elsewhere, and for
/// tests.
#[derive(Default)]
pub struct MemoryHashes {
    inner: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl MemoryHashes {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistedHashes for MemoryHashes {
    fn add(&self, hash: &str, expire_at: DateTime<Utc>) -> bool {
        let mut map = self.inner.lock().expect("hash store mutex poisoned");
        let now = Utc::now();
        map.retain(|_, expiry| *expiry > now);
        if map.contains_key(hash) {
            return false;
        }
        map.insert(hash.to_string(), expire_at);
        true
    }

    fn delete(&self, hash: &str) {
        self.inner
            .lock()
            .expect("hash store mutex poisoned")
            .remove(hash);
    }
}

/// Hash store persisted as a JSON index file, surviving restarts.
///
/// Expired entries are purged on open and on every insert. Disk write
/// failures are logged and tolerated; the in-memory view stays
/// authoritative for the life of the process.
pub struct FileBackedHashes {
    path: PathBuf,
    inner: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl FileBackedHashes {
    /// Open (or create) the store under `storage_dir`.
    pub fn open(storage_dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        use anyhow::Context;

        let dir = storage_dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating hash store dir: {}", dir.display()))?;
        let path = dir.join("hashes.json");

        let mut map: HashMap<String, DateTime<Utc>> = HashMap::new();
        if path.exists() {
            let data = std::fs::read_to_string(&path)?;
            map = serde_json::from_str(&data).unwrap_or_default();
        }
        let now = Utc::now();
        map.retain(|_, expiry| *expiry > now);

        Ok(Self {
            path,
            inner: Mutex::new(map),
        })
    }

    fn save(&self, map: &HashMap<String, DateTime<Utc>>) {
        match serde_json::to_string(map) {
            Ok(data) => {
                if let Err(err) = std::fs::write(&self.path, data) {
                    warn!(path = %self.path.display(), error = %err, "failed to persist hash store");
                }
            }
            Err(err) => warn!(error = %err, "failed to serialize hash store"),
        }
    }
}

impl PersistedHashes for FileBackedHashes {
    fn add(&self, hash: &str, expire_at: DateTime<Utc>) -> bool {
        let mut map = self.inner.lock().expect("hash store mutex poisoned");
        let now = Utc::now();
        map.retain(|_, expiry| *expiry > now);
        if map.contains_key(hash) {
            return false;
        }
        map.insert(hash.to_string(), expire_at);
        self.save(&map);
        true
    }

    fn delete(&self, hash: &str) {
        let mut map = self.inner.lock().expect("hash store mutex poisoned");
        if map.remove(hash).is_some() {
            self.save(&map);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_memory_add_is_test_and_set() {
        let store = MemoryHashes::new();
        let expiry = Utc::now() + Duration::hours(1);
        assert!(store.add("abc", expiry));
        assert!(!store.add("abc", expiry));
        store.delete("abc");
        assert!(store.add("abc", expiry));
    }

    #[test]
    fn test_memory_expired_entries_can_be_reinserted() {
        let store = MemoryHashes::new();
        assert!(store.add("abc", Utc::now() - Duration::seconds(1)));
        assert!(store.add("abc", Utc::now() + Duration::hours(1)));
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let expiry = Utc::now() + Duration::hours(1);

        {
            let store = FileBackedHashes::open(dir.path()).unwrap();
            assert!(store.add("abc", expiry));
            assert!(!store.add("abc", expiry));
        }

        // Reopen: the unexpired hash is still there.
        let store = FileBackedHashes::open(dir.path()).unwrap();
        assert!(!store.add("abc", expiry));
        store.delete("abc");
        assert!(store.add("abc", expiry));
    }

    #[test]
    fn test_file_store_purges_expired_on_open() {
        let dir = TempDir::new().unwrap();
        {
            let store = FileBackedHashes::open(dir.path()).unwrap();
            assert!(store.add("stale", Utc::now() + Duration::milliseconds(1)));
        }
        std::thread::sleep(std::time::Duration::from_millis(10));

        let store = FileBackedHashes::open(dir.path()).unwrap();
        assert!(store.add("stale", Utc::now() + Duration::hours(1)));
    }
}
