//! Configured view over a [`CacheStore`]
//!
//! Every read and write carries the configured tags plus the cache name, so
//! entries of one configured cache never collide with another's. Values are
//! stored as JSON. Backend failures are logged and treated as misses.

use super::store::{CacheStore, MemoryTagStore};
use crate::config::CacheConfig;
use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Tagged cache with a name, default tags and a default TTL
#[derive(Clone)]
pub struct TaggedCache {
    store: Arc<dyn CacheStore>,
    name: String,
    tags: Vec<String>,
    ttl: Option<Duration>,
    enabled: bool,
}

impl TaggedCache {
    pub fn new(store: Arc<dyn CacheStore>, config: &CacheConfig) -> Self {
        let mut tags = config.tags.clone();
        tags.push(config.name.clone());

        Self {
            store,
            name: config.name.clone(),
            tags,
            ttl: config.ttl(),
            enabled: config.enabled,
        }
    }

    /// Cache backed by a fresh [`MemoryTagStore`]
    pub fn in_memory(config: &CacheConfig) -> Self {
        Self::new(Arc::new(MemoryTagStore::new()), config)
    }

    /// Cache that never stores anything
    pub fn disabled() -> Self {
        Self::in_memory(&CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    fn merged_tags(&self, tags: &[String]) -> Vec<String> {
        let mut merged = self.tags.clone();
        merged.extend(tags.iter().cloned());
        merged
    }

    /// Read `key` under the configured tags
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_by_tags(&[], key)
    }

    /// Write `key` under the configured tags with the default TTL
    pub fn set<T: Serialize>(&self, key: &str, value: &T) {
        self.set_by_tags(&[], key, value)
    }

    /// Read `key` under the configured tags plus `tags`
    pub fn get_by_tags<T: DeserializeOwned>(&self, tags: &[String], key: &str) -> Option<T> {
        if !self.enabled {
            return None;
        }

        let value = match self.store.get_by_tags(&self.merged_tags(tags), key) {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(e) => {
                warn!("Cache read of '{}' failed: {}", key, e);
                return None;
            }
        };

        match serde_json::from_value(value) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Discarding cached '{}': {}", key, e);
                None
            }
        }
    }

    /// Write `key` under the configured tags plus `tags` with the default TTL
    pub fn set_by_tags<T: Serialize>(&self, tags: &[String], key: &str, value: &T) {
        self.set_by_tags_with_ttl(tags, key, value, self.ttl)
    }

    pub fn set_by_tags_with_ttl<T: Serialize>(
        &self,
        tags: &[String],
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) {
        if !self.enabled {
            return;
        }

        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                warn!("Cannot cache '{}': {}", key, e);
                return;
            }
        };

        if let Err(e) = self.store.set_by_tags(&self.merged_tags(tags), key, value, ttl) {
            warn!("Cache write of '{}' failed: {}", key, e);
        }
    }

    /// Flush every entry written under any of `tags`
    ///
    /// Only the given tags are flushed; the configured tags are left alone so
    /// one schema's invalidation does not empty the whole cache.
    pub fn delete_by_tags(&self, tags: &[String]) -> Result<()> {
        debug!("Flushing cache tags {:?}", tags);
        self.store.delete_by_tags(tags)
    }

    /// Remove `key` written under the configured tags plus `tags`
    pub fn forget(&self, tags: &[String], key: &str) -> Result<()> {
        self.store.forget(&self.merged_tags(tags), key)
    }

    /// Flush everything written under this cache's name
    pub fn flush(&self) -> Result<()> {
        self.store.delete_by_tags(&[self.name.clone()])
    }
}

impl std::fmt::Debug for TaggedCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaggedCache")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .field("ttl", &self.ttl)
            .field("enabled", &self.enabled)
            .finish()
    }
}
