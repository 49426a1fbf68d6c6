//! Shared fixtures for catalog integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use collegium::application::repos::{Document, DocumentStore, Query, StoreError};
use collegium::cache::{CacheAdapter, CacheConfig, CacheError, CacheStore, MemoryCacheStore};
use collegium::config::{InvalidationMode, PaginationSettings};
use collegium::infra::bootstrap::Catalog;
use collegium::infra::memory::MemoryDocumentStore;
use serde_json::{Map, Value, json};

pub const CACHE_CAPACITY: usize = 1_024;

/// Memory document store that counts the calls reaching it.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryDocumentStore,
    gets: AtomicUsize,
    queries: AtomicUsize,
    fail_read_after_update: AtomicBool,
    read_failure_armed: AtomicBool,
}

impl CountingStore {
    /// Make the first `get` following the next successful `update` time out.
    pub fn fail_read_after_update(&self) {
        self.fail_read_after_update.store(true, Ordering::SeqCst);
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub async fn count(&self, collection: &str) -> usize {
        self.inner.count(collection).await
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.read_failure_armed.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Timeout);
        }
        self.inner.get(collection, id).await
    }

    async fn exists(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        self.inner.exists(collection, id).await
    }

    async fn upsert(&self, collection: &str, document: Document) -> Result<(), StoreError> {
        self.inner.upsert(collection, document).await
    }

    async fn insert(&self, collection: &str, document: Document) -> Result<(), StoreError> {
        self.inner.insert(collection, document).await
    }

    async fn add(&self, collection: &str, body: Map<String, Value>) -> Result<String, StoreError> {
        self.inner.add(collection, body).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<(), StoreError> {
        self.inner.update(collection, id, patch).await?;
        if self.fail_read_after_update.swap(false, Ordering::SeqCst) {
            self.read_failure_armed.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.inner.delete(collection, id).await
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query(collection, query).await
    }
}

/// Cache store whose every call fails, standing in for an unreachable backend.
pub struct FailingCacheStore;

#[async_trait]
impl CacheStore for FailingCacheStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::backend("connection refused"))
    }

    async fn set_ex(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::backend("connection refused"))
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::backend("connection refused"))
    }

    async fn delete_prefix(&self, _prefix: &str) -> Result<u64, CacheError> {
        Err(CacheError::backend("connection refused"))
    }

    fn supports_prefix_delete(&self) -> bool {
        true
    }
}

pub struct Harness {
    pub catalog: Catalog,
    pub documents: Arc<CountingStore>,
    pub cache: Arc<MemoryCacheStore>,
}

pub fn cache_config(invalidation: InvalidationMode) -> CacheConfig {
    CacheConfig {
        memory_capacity: CACHE_CAPACITY,
        invalidation,
        ..CacheConfig::default()
    }
}

/// Catalog over counting memory stores. `prefix_scan = false` yields an
/// exact-key cache, which forces generation tags.
pub fn harness(prefix_scan: bool) -> Harness {
    harness_with(prefix_scan, cache_config(InvalidationMode::Auto))
}

pub fn harness_with(prefix_scan: bool, config: CacheConfig) -> Harness {
    let capacity = config.memory_capacity_non_zero();
    let cache = Arc::new(if prefix_scan {
        MemoryCacheStore::new(capacity)
    } else {
        MemoryCacheStore::without_prefix_scan(capacity)
    });
    let documents = Arc::new(CountingStore::default());
    let adapter = CacheAdapter::new(cache.clone() as Arc<dyn CacheStore>, config);
    let catalog = Catalog::new(
        documents.clone() as Arc<dyn DocumentStore>,
        adapter,
        PaginationSettings::default(),
    )
    .expect("catalog");
    Harness {
        catalog,
        documents,
        cache,
    }
}

/// Catalog whose cache backend fails every call.
pub fn failing_cache_harness(invalidation: InvalidationMode) -> (Catalog, Arc<CountingStore>) {
    let documents = Arc::new(CountingStore::default());
    let adapter = CacheAdapter::new(Arc::new(FailingCacheStore), cache_config(invalidation));
    let catalog = Catalog::new(
        documents.clone() as Arc<dyn DocumentStore>,
        adapter,
        PaginationSettings::default(),
    )
    .expect("catalog");
    (catalog, documents)
}

pub fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

pub async fn put(store: &dyn DocumentStore, collection: &str, id: &str, body: Value) {
    store
        .upsert(collection, Document::new(id, object(body)))
        .await
        .expect("seed document");
}

pub async fn seed_institutions(store: &dyn DocumentStore) {
    let rows = [
        (
            "a",
            "AIIMS",
            "All India Institute of Medical Sciences",
            "Delhi",
            json!(["aiims", "medical"]),
        ),
        (
            "b",
            "IISC",
            "Indian Institute of Science",
            "Bengaluru",
            json!(["iisc", "research"]),
        ),
        (
            "c",
            "IITB",
            "IIT Bombay",
            "Mumbai",
            json!(["Institute", "technology"]),
        ),
        ("d", "DU", "Delhi University", "Delhi", json!(["delhi"])),
        (
            "e",
            "JU",
            "Jadavpur University",
            "Kolkata",
            json!(["south-india"]),
        ),
        ("f", "NID", "National Institute of Design", "Ahmedabad", json!([])),
        ("g", "IITB", "IIT Bombay Extension", "Mumbai", json!(["campus"])),
    ];
    for (id, code, name, city, keywords) in rows {
        put(
            store,
            "colleges",
            id,
            json!({
                "instituteCode": code,
                "instituteName": name,
                "city": city,
                "keywords": keywords,
                "status": { "state": "active" }
            }),
        )
        .await;
    }
}

pub async fn seed_cutoffs(store: &dyn DocumentStore) {
    let rows = [
        ("k1", "IITB", 2022, 1, "GEN"),
        ("k2", "IITB", 2024, 1, "GEN"),
        ("k3", "IITB", 2023, 2, "OBC"),
        ("k4", "AIIMS", 2024, 1, "GEN"),
        ("k5", "IITB", 2024, 2, "SC"),
    ];
    for (id, code, year, round, category) in rows {
        put(
            store,
            "cutoffs",
            id,
            json!({
                "collegeId": "c",
                "instituteCode": code,
                "year": year,
                "round": round,
                "category": category,
                "openingRank": 100,
                "closingRank": 900
            }),
        )
        .await;
    }
}
