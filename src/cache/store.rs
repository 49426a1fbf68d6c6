//! Cache store contract and the in-process implementation.

use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use thiserror::Error;
use tokio::time::Instant;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("cache serialization error: {0}")]
    Serialization(String),
    #[error("cache operation `{0}` is not supported by this store")]
    Unsupported(&'static str),
}

impl CacheError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }

    pub fn serialization(err: impl std::fmt::Display) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Key/value cache holding serialized JSON snapshots with per-entry expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Delete every key starting with `prefix`, returning how many were removed.
    ///
    /// Stores that only address exact keys return [`CacheError::Unsupported`]
    /// rather than treating the prefix as a literal key.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheError>;

    fn supports_prefix_delete(&self) -> bool;
}

struct Entry {
    value: String,
    expires_at: Instant,
}

/// Bounded in-memory cache with LRU eviction and lazy expiry.
pub struct MemoryCacheStore {
    entries: RwLock<LruCache<String, Entry>>,
    prefix_scan: bool,
}

impl MemoryCacheStore {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
            prefix_scan: true,
        }
    }

    /// A store that only supports exact-key operations.
    pub fn without_prefix_scan(capacity: NonZeroUsize) -> Self {
        Self {
            prefix_scan: false,
            ..Self::new(capacity)
        }
    }

    /// Number of resident entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        match entries.get(key) {
            None => return Ok(None),
            Some(entry) if entry.expires_at > Instant::now() => {
                return Ok(Some(entry.value.clone()));
            }
            Some(_) => {}
        }
        entries.pop(key);
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        rw_write(&self.entries, SOURCE, "set_ex").put(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        rw_write(&self.entries, SOURCE, "delete").pop(key);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        if !self.prefix_scan {
            return Err(CacheError::Unsupported("delete_prefix"));
        }
        let mut entries = rw_write(&self.entries, SOURCE, "delete_prefix");
        let matching: Vec<String> = entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &matching {
            entries.pop(key);
        }
        Ok(matching.len() as u64)
    }

    fn supports_prefix_delete(&self) -> bool {
        self.prefix_scan
    }
}
