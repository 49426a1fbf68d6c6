//! Cache configuration.
//!
//! Controls entry lifetimes, key layout and invalidation via `collegium.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

use crate::config::{CacheSettings, InvalidationMode};

use super::keys::Namespace;

const DEFAULT_KEY_PREFIX: &str = "collegium";
const DEFAULT_DETAIL_TTL_SECS: u64 = 60 * 60;
const DEFAULT_LIST_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_SEARCH_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_FEED_TTL_SECS: u64 = 5 * 60;
const DEFAULT_MEMORY_CAPACITY: usize = 10_000;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Leading segment of every key written by this process.
    pub key_prefix: String,
    pub detail_ttl_seconds: u64,
    pub list_ttl_seconds: u64,
    pub search_ttl_seconds: u64,
    /// Lifetime of version and update-feed entries.
    pub feed_ttl_seconds: u64,
    /// Maximum entries held by the in-memory store.
    pub memory_capacity: usize,
    /// Serve search results from the cache; write-back is skipped too when off.
    pub search_reads_enabled: bool,
    pub invalidation: InvalidationMode,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            detail_ttl_seconds: DEFAULT_DETAIL_TTL_SECS,
            list_ttl_seconds: DEFAULT_LIST_TTL_SECS,
            search_ttl_seconds: DEFAULT_SEARCH_TTL_SECS,
            feed_ttl_seconds: DEFAULT_FEED_TTL_SECS,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            search_reads_enabled: true,
            invalidation: InvalidationMode::Auto,
        }
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            key_prefix: settings.key_prefix.clone(),
            detail_ttl_seconds: settings.detail_ttl.as_secs(),
            list_ttl_seconds: settings.list_ttl.as_secs(),
            search_ttl_seconds: settings.search_ttl.as_secs(),
            feed_ttl_seconds: settings.feed_ttl.as_secs(),
            memory_capacity: settings.memory_capacity.get(),
            search_reads_enabled: settings.search_reads_enabled,
            invalidation: settings.invalidation,
        }
    }
}

impl CacheConfig {
    /// Entry lifetime for a namespace, never shorter than one second.
    pub fn ttl(&self, namespace: Namespace) -> Duration {
        let seconds = match namespace {
            Namespace::Detail => self.detail_ttl_seconds,
            Namespace::List => self.list_ttl_seconds,
            Namespace::Search => self.search_ttl_seconds,
            Namespace::Version | Namespace::Updates => self.feed_ttl_seconds,
        };
        Duration::from_secs(seconds.max(1))
    }

    /// Generation tags outlive every entry that embeds them, so an expired tag
    /// can never resurrect entries written under an earlier one.
    pub fn generation_ttl(&self) -> Duration {
        self.ttl(Namespace::List).max(self.ttl(Namespace::Search)) * 2
    }

    /// Returns the memory capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn memory_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.memory_capacity).unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert_eq!(config.key_prefix, "collegium");
        assert_eq!(config.ttl(Namespace::Detail), Duration::from_secs(3600));
        assert_eq!(config.ttl(Namespace::List), Duration::from_secs(86_400));
        assert_eq!(config.ttl(Namespace::Search), Duration::from_secs(86_400));
        assert_eq!(config.ttl(Namespace::Updates), Duration::from_secs(300));
        assert!(config.search_reads_enabled);
    }

    #[test]
    fn generation_tag_outlives_collection_entries() {
        let config = CacheConfig {
            list_ttl_seconds: 10,
            search_ttl_seconds: 30,
            ..Default::default()
        };
        assert_eq!(config.generation_ttl(), Duration::from_secs(60));
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = CacheConfig {
            memory_capacity: 0,
            ..Default::default()
        };
        assert_eq!(config.memory_capacity_non_zero().get(), 1);
    }
}
