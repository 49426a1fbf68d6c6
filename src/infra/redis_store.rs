//! Redis-backed cache store.

use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::debug;

use crate::cache::{CacheError, CacheStore};

/// Keys deleted per `DEL` round trip during prefix invalidation.
const DELETE_BATCH: usize = 256;

#[derive(Clone)]
pub struct RedisCacheStore {
    connection: ConnectionManager,
}

impl RedisCacheStore {
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = Client::open(url).map_err(CacheError::backend)?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(CacheError::backend)?;
        Ok(Self { connection })
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        let pattern = format!("{}*", escape_glob(prefix));
        let mut connection = self.connection.clone();
        let mut iter = connection
            .scan_match::<_, String>(pattern.as_str())
            .await
            .map_err(CacheError::backend)?;

        let mut keys = Vec::new();
        while let Some(key) = iter.next_item().await {
            keys.push(key);
        }
        Ok(keys)
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut connection = self.connection.clone();
        connection
            .get::<_, Option<String>>(key)
            .await
            .map_err(CacheError::backend)
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut connection = self.connection.clone();
        connection
            .set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await
            .map_err(CacheError::backend)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut connection = self.connection.clone();
        connection
            .del::<_, ()>(key)
            .await
            .map_err(CacheError::backend)
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        let keys = self.scan_prefix(prefix).await?;
        let mut connection = self.connection.clone();
        let mut removed = 0u64;
        for chunk in keys.chunks(DELETE_BATCH) {
            removed += connection
                .del::<_, u64>(chunk)
                .await
                .map_err(CacheError::backend)?;
        }
        debug!(prefix, removed, "redis prefix invalidated");
        Ok(removed)
    }

    fn supports_prefix_delete(&self) -> bool {
        true
    }
}

/// Escape glob metacharacters so a key prefix matches literally in `SCAN MATCH`.
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for ch in prefix.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\' | '^') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
