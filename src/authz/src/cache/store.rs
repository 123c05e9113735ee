//! Tag-indexed key/value stores

use crate::error::Result;
use blake3::Hasher;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Backend contract for the tagged cache
///
/// An entry written under a tag set is readable with the same set, in any
/// order, and becomes unreachable once any tag of the set is flushed.
/// Entries are always replaced whole. Backends report their own failures
/// as [`AuthzError::Cache`](crate::AuthzError::Cache).
pub trait CacheStore: Send + Sync {
    /// Read `key` under `tags`
    fn get_by_tags(&self, tags: &[String], key: &str) -> Result<Option<Value>>;

    /// Write `key` under `tags`; `None` keeps the entry until invalidated
    fn set_by_tags(&self, tags: &[String], key: &str, value: Value, ttl: Option<Duration>) -> Result<()>;

    /// Flush every entry written under any of `tags`
    fn delete_by_tags(&self, tags: &[String]) -> Result<()>;

    /// Remove a single entry written under `tags`
    fn forget(&self, tags: &[String], key: &str) -> Result<()>;

    /// Remove everything
    fn flush(&self) -> Result<()>;

    /// Read an untagged entry
    fn get(&self, key: &str) -> Result<Option<Value>> {
        self.get_by_tags(&[], key)
    }

    /// Write an untagged entry
    fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<()> {
        self.set_by_tags(&[], key, value, ttl)
    }
}

/// Statistics about store usage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub hits: usize,
    pub misses: usize,
    pub expirations: usize,
    pub entries: usize,
}

impl StoreStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone)]
struct StoredEntry {
    value: Value,
    expires_at: Option<Instant>,
}

impl StoredEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// In-process tag store
///
/// Tags carry a version; the storage key of an entry is derived from the
/// versions of its tags, so flushing a tag bumps its version and orphans
/// every entry written under it. Orphans are reclaimed eagerly through a
/// tag → storage-key index. A write racing a flush of one of its tags is
/// dropped once the write sees the bumped version.
pub struct MemoryTagStore {
    entries: Arc<DashMap<String, StoredEntry>>,
    versions: Arc<DashMap<String, u64>>,
    index: Arc<DashMap<String, HashSet<String>>>,
    next_version: AtomicU64,
    stats: Arc<DashMap<String, usize>>,
}

impl MemoryTagStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            versions: Arc::new(DashMap::new()),
            index: Arc::new(DashMap::new()),
            next_version: AtomicU64::new(1),
            stats: Arc::new(DashMap::new()),
        }
    }

    /// Number of stored entries, including expired ones not yet reclaimed
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes expired entries
    pub fn cleanup_expired(&self) {
        self.entries.retain(|_, entry| !entry.is_expired());
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            hits: self.get_stat("hits"),
            misses: self.get_stat("misses"),
            expirations: self.get_stat("expirations"),
            entries: self.entries.len(),
        }
    }

    pub fn reset_stats(&self) {
        self.stats.clear();
    }

    fn normalize(tags: &[String]) -> Vec<&str> {
        let mut tags: Vec<&str> = tags.iter().map(String::as_str).collect();
        tags.sort_unstable();
        tags.dedup();
        tags
    }

    fn version(&self, tag: &str) -> u64 {
        if let Some(version) = self.versions.get(tag) {
            return *version;
        }
        *self
            .versions
            .entry(tag.to_string())
            .or_insert_with(|| self.next_version.fetch_add(1, Ordering::Relaxed))
    }

    /// Storage key for `key` under the current versions of `tags`
    fn storage_key(&self, tags: &[&str], key: &str) -> String {
        if tags.is_empty() {
            return format!("plain:{}", key);
        }

        let mut hasher = Hasher::new();
        for tag in tags {
            hasher.update(tag.as_bytes());
            hasher.update(&[0]);
            hasher.update(&self.version(tag).to_le_bytes());
        }
        format!("{}:{}", hasher.finalize().to_hex(), key)
    }

    fn increment_stat(&self, key: &str) {
        self.stats
            .entry(key.to_string())
            .and_modify(|count| *count += 1)
            .or_insert(1);
    }

    fn get_stat(&self, key: &str) -> usize {
        self.stats.get(key).map(|v| *v).unwrap_or(0)
    }
}

impl Default for MemoryTagStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore for MemoryTagStore {
    fn get_by_tags(&self, tags: &[String], key: &str) -> Result<Option<Value>> {
        let tags = Self::normalize(tags);
        let storage_key = self.storage_key(&tags, key);

        if let Some(entry) = self.entries.get(&storage_key) {
            if entry.is_expired() {
                drop(entry);
                self.entries.remove(&storage_key);
                self.increment_stat("expirations");
                self.increment_stat("misses");
                return Ok(None);
            }

            self.increment_stat("hits");
            return Ok(Some(entry.value.clone()));
        }

        self.increment_stat("misses");
        Ok(None)
    }

    fn set_by_tags(&self, tags: &[String], key: &str, value: Value, ttl: Option<Duration>) -> Result<()> {
        let tags = Self::normalize(tags);
        let storage_key = self.storage_key(&tags, key);

        self.entries.insert(
            storage_key.clone(),
            StoredEntry {
                value,
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );

        for tag in &tags {
            self.index
                .entry(tag.to_string())
                .or_default()
                .insert(storage_key.clone());
        }

        // a flush that bumped a tag after the key was derived may have
        // swept the index before this entry was added to it
        if self.storage_key(&tags, key) != storage_key {
            self.entries.remove(&storage_key);
        }
        Ok(())
    }

    fn delete_by_tags(&self, tags: &[String]) -> Result<()> {
        for tag in Self::normalize(tags) {
            let version = self.next_version.fetch_add(1, Ordering::Relaxed);
            self.versions.insert(tag.to_string(), version);

            if let Some((_, keys)) = self.index.remove(tag) {
                for key in keys {
                    self.entries.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn forget(&self, tags: &[String], key: &str) -> Result<()> {
        let tags = Self::normalize(tags);
        let storage_key = self.storage_key(&tags, key);
        self.entries.remove(&storage_key);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.entries.clear();
        self.index.clear();
        self.versions.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_tag_order_is_irrelevant() {
        let store = MemoryTagStore::new();
        store
            .set_by_tags(&tags(&["a", "b"]), "k", json!(1), None)
            .unwrap();

        assert_eq!(store.get_by_tags(&tags(&["b", "a"]), "k").unwrap(), Some(json!(1)));
        assert_eq!(store.get_by_tags(&tags(&["a"]), "k").unwrap(), None);
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_flushing_one_tag_invalidates_sets_containing_it() {
        let store = MemoryTagStore::new();
        store.set_by_tags(&tags(&["schema_a", "type_x"]), "f1", json!("x"), None).unwrap();
        store.set_by_tags(&tags(&["schema_a", "type_y"]), "f2", json!("y"), None).unwrap();
        store.set_by_tags(&tags(&["schema_b", "type_x"]), "f3", json!("z"), None).unwrap();

        store.delete_by_tags(&tags(&["type_x"])).unwrap();

        assert_eq!(store.get_by_tags(&tags(&["schema_a", "type_x"]), "f1").unwrap(), None);
        assert_eq!(store.get_by_tags(&tags(&["schema_b", "type_x"]), "f3").unwrap(), None);
        assert_eq!(
            store.get_by_tags(&tags(&["schema_a", "type_y"]), "f2").unwrap(),
            Some(json!("y"))
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_writes_after_flush_are_readable() {
        let store = MemoryTagStore::new();
        let set = tags(&["t"]);
        store.set_by_tags(&set, "k", json!(1), None).unwrap();
        store.delete_by_tags(&set).unwrap();
        store.set_by_tags(&set, "k", json!(2), None).unwrap();
        assert_eq!(store.get_by_tags(&set, "k").unwrap(), Some(json!(2)));
    }

    #[test]
    fn test_ttl_expiry() {
        let store = MemoryTagStore::new();
        store
            .set("short", json!(true), Some(Duration::from_millis(20)))
            .unwrap();
        store.set("long", json!(true), None).unwrap();

        std::thread::sleep(Duration::from_millis(50));

        assert_eq!(store.get("short").unwrap(), None);
        assert_eq!(store.get("long").unwrap(), Some(json!(true)));
        assert_eq!(store.stats().expirations, 1);
    }

    #[test]
    fn test_cleanup_and_forget() {
        let store = MemoryTagStore::new();
        store.set("a", json!(1), Some(Duration::from_millis(1))).unwrap();
        store.set_by_tags(&tags(&["t"]), "b", json!(2), None).unwrap();

        std::thread::sleep(Duration::from_millis(10));
        store.cleanup_expired();
        assert_eq!(store.len(), 1);

        store.forget(&tags(&["t"]), "b").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_writes_racing_flushes_leave_no_orphans() {
        let store = Arc::new(MemoryTagStore::new());
        let set = tags(&["schema_a", "type_x"]);

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let store = Arc::clone(&store);
                let set = set.clone();
                std::thread::spawn(move || {
                    for n in 0..500 {
                        store
                            .set_by_tags(&set, &format!("{}:{}", w, n % 20), json!(n), None)
                            .unwrap();
                    }
                })
            })
            .collect();
        let flusher = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..500 {
                    store.delete_by_tags(&tags(&["type_x"])).unwrap();
                }
            })
        };

        for writer in writers {
            writer.join().unwrap();
        }
        flusher.join().unwrap();

        store.delete_by_tags(&tags(&["type_x"])).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_stats() {
        let store = MemoryTagStore::new();
        store.get("missing").unwrap();
        store.set("k", json!(0), None).unwrap();
        store.get("k").unwrap();

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }
}
