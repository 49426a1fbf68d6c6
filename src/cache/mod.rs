//! Collegium cache layer.
//!
//! Cache-aside support for the catalog:
//!
//! - **Keys**: deterministic, namespaced keys over canonicalised parameters
//! - **Store**: the `CacheStore` contract plus a bounded in-memory store
//! - **Adapter**: typed JSON snapshots with graceful degradation and metrics
//! - **Invalidation**: prefix deletion or generation tags after mutations
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! backend = "memory"          # memory | redis | disabled
//! key_prefix = "collegium"
//! detail_ttl_seconds = 3600
//! list_ttl_seconds = 86400
//! invalidation = "auto"       # auto | prefix | generation
//! ```

mod adapter;
mod config;
mod invalidation;
mod keys;
mod lock;
mod store;

pub use adapter::CacheAdapter;
pub(crate) use adapter::degraded;
pub use config::CacheConfig;
pub use invalidation::{InvalidationPolicy, InvalidationStrategy};
pub use keys::{CacheKeyBuilder, Namespace, canonical_json, params_digest};
pub use store::{CacheError, CacheStore, MemoryCacheStore};

/// Metric names emitted by the cache layer.
pub mod metric_names {
    pub use super::adapter::{CACHE_ERROR_TOTAL, CACHE_HIT_TOTAL, CACHE_MISS_TOTAL};
    pub use super::invalidation::INVALIDATION_FAILED_TOTAL;
}
