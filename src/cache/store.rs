//! Cache storage: the async `TagCache` trait and the in-memory backend.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use thiserror::Error;

use super::config::CacheConfig;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Tag-addressable byte cache. Backends are swappable; the entity wrappers
/// only depend on this trait.
#[async_trait]
pub trait TagCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;
    async fn set(&self, key: &str, value: Bytes, tags: &[String]) -> Result<(), CacheError>;
    async fn delete_key(&self, key: &str) -> Result<(), CacheError>;
    /// Evict every entry carrying `tag`.
    async fn delete_tag(&self, tag: &str) -> Result<(), CacheError>;
}

struct Inner {
    entries: LruCache<String, Bytes>,
    tag_to_keys: HashMap<String, HashSet<String>>,
    key_to_tags: HashMap<String, Vec<String>>,
}

impl Inner {
    fn forget(&mut self, key: &str) {
        if let Some(tags) = self.key_to_tags.remove(key) {
            for tag in tags {
                if let Some(keys) = self.tag_to_keys.get_mut(&tag) {
                    keys.remove(key);
                    if keys.is_empty() {
                        self.tag_to_keys.remove(&tag);
                    }
                }
            }
        }
    }
}

/// LRU-bounded in-memory backend. Tag bookkeeping lives under the same lock
/// as the entry map so eviction never leaves dangling tag references.
///
/// A disabled configuration turns the backend into a no-op: every read is a
/// miss and writes are discarded, so the wrapped repositories always reach
/// their inner store.
pub struct MemoryCache {
    inner: RwLock<Inner>,
    enabled: bool,
}

impl MemoryCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: LruCache::new(config.entry_limit_non_zero()),
                tag_to_keys: HashMap::new(),
                key_to_tags: HashMap::new(),
            }),
            enabled: config.enabled,
        }
    }

    /// Current entry count, for tests and diagnostics.
    pub fn len(&self) -> usize {
        rw_read(&self.inner, SOURCE, "len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TagCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        if !self.enabled {
            return Ok(None);
        }
        // LruCache::get reorders, so even reads take the write lock.
        let value = rw_write(&self.inner, SOURCE, "get").entries.get(key).cloned();
        match &value {
            Some(_) => counter!("varco_cache_hit_total").increment(1),
            None => counter!("varco_cache_miss_total").increment(1),
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: Bytes, tags: &[String]) -> Result<(), CacheError> {
        if !self.enabled {
            return Ok(());
        }
        let mut inner = rw_write(&self.inner, SOURCE, "set");
        if let Some((evicted_key, _)) = inner.entries.push(key.to_string(), value) {
            if evicted_key != key {
                counter!("varco_cache_evict_total").increment(1);
                inner.forget(&evicted_key);
            }
        }
        inner.forget(key);
        inner.key_to_tags.insert(key.to_string(), tags.to_vec());
        for tag in tags {
            inner
                .tag_to_keys
                .entry(tag.clone())
                .or_default()
                .insert(key.to_string());
        }
        Ok(())
    }

    async fn delete_key(&self, key: &str) -> Result<(), CacheError> {
        let mut inner = rw_write(&self.inner, SOURCE, "delete_key");
        inner.entries.pop(key);
        inner.forget(key);
        Ok(())
    }

    async fn delete_tag(&self, tag: &str) -> Result<(), CacheError> {
        let mut inner = rw_write(&self.inner, SOURCE, "delete_tag");
        let Some(keys) = inner.tag_to_keys.remove(tag) else {
            return Ok(());
        };
        for key in keys {
            inner.entries.pop(&key);
            inner.forget(&key);
        }
        Ok(())
    }
}
