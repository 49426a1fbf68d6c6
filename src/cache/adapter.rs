//! Typed, failure-tolerant access to the cache store.
//!
//! Every read and write-back goes through [`CacheAdapter`], which serializes
//! snapshots as JSON, records hit/miss metrics per namespace and downgrades
//! store failures to warnings. A disabled adapter behaves as a permanently
//! empty cache.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use super::config::CacheConfig;
use super::keys::{CacheKeyBuilder, Namespace};
use super::store::{CacheError, CacheStore};

pub const CACHE_HIT_TOTAL: &str = "collegium_cache_hit_total";
pub const CACHE_MISS_TOTAL: &str = "collegium_cache_miss_total";
pub const CACHE_ERROR_TOTAL: &str = "collegium_cache_error_total";

#[derive(Clone)]
pub struct CacheAdapter {
    store: Option<Arc<dyn CacheStore>>,
    keys: CacheKeyBuilder,
    config: CacheConfig,
}

impl CacheAdapter {
    pub fn new(store: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        Self {
            store: Some(store),
            keys: CacheKeyBuilder::new(config.key_prefix.clone()),
            config,
        }
    }

    /// An adapter that never stores anything; every read is a store query.
    pub fn disabled(config: CacheConfig) -> Self {
        Self {
            store: None,
            keys: CacheKeyBuilder::new(config.key_prefix.clone()),
            config,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub fn keys(&self) -> &CacheKeyBuilder {
        &self.keys
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub(crate) fn store(&self) -> Option<&Arc<dyn CacheStore>> {
        self.store.as_ref()
    }

    /// Read and decode a snapshot. Backend and decode failures count as a miss.
    pub async fn get_json<T>(&self, namespace: Namespace, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let store = self.store.as_ref()?;
        let label = namespace.as_str();

        let raw = match store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                counter!(CACHE_MISS_TOTAL, "namespace" => label).increment(1);
                return None;
            }
            Err(err) => {
                degraded(namespace, "get", key, &err);
                counter!(CACHE_MISS_TOTAL, "namespace" => label).increment(1);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                counter!(CACHE_HIT_TOTAL, "namespace" => label).increment(1);
                debug!(namespace = label, key, "cache hit");
                Some(value)
            }
            Err(err) => {
                degraded(namespace, "decode", key, &CacheError::serialization(err));
                counter!(CACHE_MISS_TOTAL, "namespace" => label).increment(1);
                None
            }
        }
    }

    /// Write a snapshot back with the namespace TTL, logging on failure.
    pub async fn put_json<T>(&self, namespace: Namespace, key: &str, value: &T)
    where
        T: Serialize + ?Sized,
    {
        let Some(store) = self.store.as_ref() else {
            return;
        };

        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                degraded(namespace, "encode", key, &CacheError::serialization(err));
                return;
            }
        };

        if let Err(err) = store.set_ex(key, raw, self.config.ttl(namespace)).await {
            degraded(namespace, "set_ex", key, &err);
        }
    }

    pub(crate) async fn get_raw(&self, key: &str) -> Result<Option<String>, CacheError> {
        match self.store.as_ref() {
            Some(store) => store.get(key).await,
            None => Ok(None),
        }
    }

    pub(crate) async fn set_raw(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        match self.store.as_ref() {
            Some(store) => store.set_ex(key, value, ttl).await,
            None => Ok(()),
        }
    }
}

/// Count and log a cache failure that the caller recovers from.
pub(crate) fn degraded(namespace: Namespace, op: &'static str, key: &str, err: &CacheError) {
    counter!(CACHE_ERROR_TOTAL, "namespace" => namespace.as_str()).increment(1);
    warn!(
        namespace = namespace.as_str(),
        op,
        key,
        error = %err,
        "cache degraded; falling back to the document store"
    );
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use serde_json::{Value, json};

    use super::*;
    use crate::cache::store::MemoryCacheStore;

    fn adapter() -> (CacheAdapter, Arc<MemoryCacheStore>) {
        let store = Arc::new(MemoryCacheStore::new(
            NonZeroUsize::new(16).expect("capacity"),
        ));
        (
            CacheAdapter::new(store.clone(), CacheConfig::default()),
            store,
        )
    }

    #[tokio::test]
    async fn snapshots_round_trip_through_the_store() {
        let (adapter, _) = adapter();
        let value = json!({ "id": "iit-b", "year": 2024 });

        adapter.put_json(Namespace::Detail, "k", &value).await;
        let cached: Option<Value> = adapter.get_json(Namespace::Detail, "k").await;
        assert_eq!(cached, Some(value));
    }

    #[tokio::test]
    async fn undecodable_entries_are_misses() {
        let (adapter, store) = adapter();
        store
            .set_ex("k", "{not json".to_string(), Duration::from_secs(60))
            .await
            .expect("set");

        let cached: Option<Value> = adapter.get_json(Namespace::List, "k").await;
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn disabled_adapter_never_hits() {
        let adapter = CacheAdapter::disabled(CacheConfig::default());
        adapter.put_json(Namespace::Detail, "k", &json!(1)).await;

        let cached: Option<Value> = adapter.get_json(Namespace::Detail, "k").await;
        assert!(cached.is_none());
        assert!(!adapter.is_enabled());
    }
}
