//! Cache invalidation after record mutations.
//!
//! A write to record `X` of some kind removes `detail:X` and makes every cached
//! list and search result of that kind unreachable. The second half needs a
//! store that can delete by prefix; stores addressing exact keys only get a
//! generation tag instead, embedded in each list/search key at write time and
//! rotated on mutation.

use futures::future::join_all;
use metrics::counter;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::InvalidationMode;
use crate::domain::types::RecordKind;

use super::adapter::CacheAdapter;
use super::keys::Namespace;
use super::store::CacheError;

pub const INVALIDATION_FAILED_TOTAL: &str = "collegium_cache_invalidation_failed_total";

const COLLECTION_NAMESPACES: [Namespace; 2] = [Namespace::List, Namespace::Search];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationStrategy {
    PrefixDelete,
    GenerationTag,
}

#[derive(Clone)]
pub struct InvalidationPolicy {
    cache: CacheAdapter,
    strategy: InvalidationStrategy,
}

impl InvalidationPolicy {
    /// Resolve the configured mode against the store's capabilities.
    ///
    /// Asking for prefix deletion on a store that cannot scan is rejected up
    /// front instead of silently invalidating nothing.
    pub fn new(cache: CacheAdapter) -> Result<Self, CacheError> {
        let supports_prefix = cache
            .store()
            .is_some_and(|store| store.supports_prefix_delete());

        let strategy = match (cache.config().invalidation, supports_prefix) {
            (InvalidationMode::Generation, _) => InvalidationStrategy::GenerationTag,
            (InvalidationMode::Prefix | InvalidationMode::Auto, true) => {
                InvalidationStrategy::PrefixDelete
            }
            (InvalidationMode::Auto, false) => InvalidationStrategy::GenerationTag,
            (InvalidationMode::Prefix, false) => {
                if cache.is_enabled() {
                    return Err(CacheError::Unsupported("delete_prefix"));
                }
                InvalidationStrategy::PrefixDelete
            }
        };

        Ok(Self { cache, strategy })
    }

    pub fn strategy(&self) -> InvalidationStrategy {
        self.strategy
    }

    pub fn cache(&self) -> &CacheAdapter {
        &self.cache
    }

    /// Tag to embed in list/search keys of `kind`; `None` under prefix deletion.
    ///
    /// A missing tag is minted on demand. An error means the tag could not be
    /// read, and callers must bypass the cache rather than risk serving an
    /// entry from a retired generation.
    pub async fn collection_generation(
        &self,
        kind: RecordKind,
    ) -> Result<Option<String>, CacheError> {
        if self.strategy == InvalidationStrategy::PrefixDelete || !self.cache.is_enabled() {
            return Ok(None);
        }

        let key = self.cache.keys().generation(kind);
        if let Some(tag) = self.cache.get_raw(&key).await? {
            return Ok(Some(tag));
        }

        let tag = Uuid::new_v4().simple().to_string();
        self.cache
            .set_raw(&key, tag.clone(), self.cache.config().generation_ttl())
            .await?;
        Ok(Some(tag))
    }

    /// Drop every cache entry a write to record `id` may have made stale.
    ///
    /// Failures are logged and counted, never returned: the store write has
    /// already happened and stays the source of truth.
    pub async fn record_written(&self, kind: RecordKind, id: &str) {
        if let Some(store) = self.cache.store() {
            let key = self.cache.keys().detail(kind, id);
            if let Err(err) = store.delete(&key).await {
                invalidation_failed(kind, Namespace::Detail, &key, &err);
            }
        }
        self.invalidate_collections(kind).await;
    }

    /// Make every cached list and search result of `kind` unreachable.
    pub async fn invalidate_collections(&self, kind: RecordKind) {
        let Some(store) = self.cache.store() else {
            return;
        };

        match self.strategy {
            InvalidationStrategy::PrefixDelete => {
                let deletions = COLLECTION_NAMESPACES.map(|namespace| {
                    let prefix = self.cache.keys().namespace_prefix(kind, namespace);
                    async move {
                        let outcome = store.delete_prefix(&prefix).await;
                        (namespace, prefix, outcome)
                    }
                });
                // Only reached for stores that scan; an exact-key store would
                // read the prefix as one literal key and delete nothing.
                for (namespace, prefix, outcome) in join_all(deletions).await {
                    match outcome {
                        Ok(removed) => debug!(
                            kind = kind.as_str(),
                            namespace = namespace.as_str(),
                            removed,
                            "collection entries invalidated"
                        ),
                        Err(err) => invalidation_failed(kind, namespace, &prefix, &err),
                    }
                }
            }
            InvalidationStrategy::GenerationTag => {
                let key = self.cache.keys().generation(kind);
                let tag = Uuid::new_v4().simple().to_string();
                let ttl = self.cache.config().generation_ttl();
                match store.set_ex(&key, tag, ttl).await {
                    Ok(()) => debug!(kind = kind.as_str(), "collection generation rotated"),
                    Err(err) => {
                        for namespace in COLLECTION_NAMESPACES {
                            invalidation_failed(kind, namespace, &key, &err);
                        }
                    }
                }
            }
        }
    }
}

fn invalidation_failed(kind: RecordKind, namespace: Namespace, target: &str, err: &CacheError) {
    counter!(INVALIDATION_FAILED_TOTAL, "namespace" => namespace.as_str()).increment(1);
    warn!(
        kind = kind.as_str(),
        namespace = namespace.as_str(),
        target,
        error = %err,
        "cache invalidation failed; entries may stay stale until their TTL"
    );
}
