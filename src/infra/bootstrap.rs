//! Wire settings into a ready-to-use catalog.

use std::sync::Arc;

use tracing::{info, warn};

use crate::application::catalog::CatalogService;
use crate::application::feed::UpdateFeed;
use crate::application::repos::DocumentStore;
use crate::cache::{CacheAdapter, CacheConfig, CacheStore, InvalidationPolicy, MemoryCacheStore};
use crate::config::{CacheBackend, CacheSettings, PaginationSettings, Settings, StoreBackend, StoreSettings};
use crate::domain::entities::{Cutoff, Institution};

use super::db::PostgresDocumentStore;
use super::error::InfraError;
use super::memory::MemoryDocumentStore;
use super::redis_store::RedisCacheStore;

/// Services for every record kind, sharing one document store and one cache.
pub struct Catalog {
    pub institutions: CatalogService<Institution>,
    pub cutoffs: CatalogService<Cutoff>,
    pub feed: UpdateFeed,
    pub invalidation: InvalidationPolicy,
}

impl Catalog {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        cache: CacheAdapter,
        pagination: PaginationSettings,
    ) -> Result<Self, InfraError> {
        let invalidation = InvalidationPolicy::new(cache.clone())?;
        Ok(Self {
            institutions: CatalogService::new(
                Arc::clone(&store),
                invalidation.clone(),
                pagination.clone(),
            ),
            cutoffs: CatalogService::new(Arc::clone(&store), invalidation.clone(), pagination),
            feed: UpdateFeed::new(store, cache),
            invalidation,
        })
    }

    pub async fn from_settings(settings: &Settings) -> Result<Self, InfraError> {
        let store = document_store(&settings.store).await?;
        let cache = cache_adapter(&settings.cache).await;
        let catalog = Self::new(store, cache, settings.pagination.clone())?;
        info!(
            strategy = ?catalog.invalidation.strategy(),
            cache_enabled = catalog.invalidation.cache().is_enabled(),
            "catalog ready"
        );
        Ok(catalog)
    }
}

pub async fn document_store(settings: &StoreSettings) -> Result<Arc<dyn DocumentStore>, InfraError> {
    match &settings.backend {
        StoreBackend::Memory => {
            warn!("using the in-memory document store; data is lost on exit");
            Ok(Arc::new(MemoryDocumentStore::new()))
        }
        StoreBackend::Postgres { url } => {
            let pool = PostgresDocumentStore::connect(url, settings.max_connections.get())
                .await
                .map_err(|err| InfraError::database(err.to_string()))?;
            Ok(Arc::new(PostgresDocumentStore::new(pool)))
        }
    }
}

/// Build the cache adapter. An unreachable cache backend degrades to running
/// without a cache rather than failing startup.
pub async fn cache_adapter(settings: &CacheSettings) -> CacheAdapter {
    let config = CacheConfig::from(settings);
    let store: Arc<dyn CacheStore> = match &settings.backend {
        CacheBackend::Disabled => return CacheAdapter::disabled(config),
        CacheBackend::Memory => Arc::new(MemoryCacheStore::new(settings.memory_capacity)),
        CacheBackend::Redis { url } => match RedisCacheStore::connect(url).await {
            Ok(store) => Arc::new(store),
            Err(err) => {
                warn!(error = %err, "cache backend unreachable; continuing without a cache");
                return CacheAdapter::disabled(config);
            }
        },
    };
    CacheAdapter::new(store, config)
}

pub async fn migrate(settings: &StoreSettings) -> Result<(), InfraError> {
    let StoreBackend::Postgres { url } = &settings.backend else {
        return Err(InfraError::configuration(
            "migrations require the postgres store backend",
        ));
    };
    let pool = PostgresDocumentStore::connect(url, settings.max_connections.get())
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;
    PostgresDocumentStore::run_migrations(&pool)
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;
    info!("migrations applied");
    Ok(())
}
