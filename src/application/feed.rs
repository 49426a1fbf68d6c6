//! Versioned update feed.
//!
//! Each record kind owns a monotonically increasing counter in the metadata
//! collection plus an append-only log of update records keyed by version.
//! Clients poll the counter and fetch the `(from, to]` slice they are missing.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, instrument};

use crate::application::error::AppError;
use crate::application::repos::{Document, DocumentStore, Filter, FilterOp, OrderBy, Query, StoreError};
use crate::application::store_failure;
use crate::cache::{CacheAdapter, Namespace};
use crate::domain::entities::{FeedVersion, UpdateRecord};
use crate::domain::types::{RecordKind, SortDirection};

/// Collection holding one version counter document per record kind.
pub const METADATA_COLLECTION: &str = "metadata";

const INITIAL_VERSION: u64 = 1;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdatesKey {
    from_version: u64,
    to_version: u64,
}

#[derive(Clone)]
pub struct UpdateFeed {
    store: Arc<dyn DocumentStore>,
    cache: CacheAdapter,
}

impl UpdateFeed {
    pub fn new(store: Arc<dyn DocumentStore>, cache: CacheAdapter) -> Self {
        Self { store, cache }
    }

    /// Current counter for `kind`, initialising it to 1 on first use.
    #[instrument(skip(self))]
    pub async fn version(&self, kind: RecordKind) -> Result<FeedVersion, AppError> {
        let key = self.cache.keys().version(kind);
        if let Some(version) = self.cache.get_json::<FeedVersion>(Namespace::Version, &key).await {
            return Ok(version);
        }

        let version = match self.stored_version(kind).await? {
            Some(version) => version,
            None => self.initialise(kind).await?,
        };

        self.cache.put_json(Namespace::Version, &key, &version).await;
        Ok(version)
    }

    /// Update records with `from < version <= to`, in ascending version order.
    ///
    /// `to` is required; `from` defaults to 0. A slice is only cached once the
    /// counter has reached `to`, since later writes cannot change it after that.
    #[instrument(skip(self))]
    pub async fn updates(
        &self,
        kind: RecordKind,
        from: Option<u64>,
        to: Option<u64>,
    ) -> Result<Vec<UpdateRecord>, AppError> {
        let to = to.ok_or_else(|| AppError::missing("toVersion"))?;
        let from = from.unwrap_or(0);
        if from >= to {
            return Ok(Vec::new());
        }

        let params = UpdatesKey {
            from_version: from,
            to_version: to,
        };
        let key = match self.cache.keys().build_key(kind, Namespace::Updates, &params) {
            Ok(key) => Some(key),
            Err(err) => {
                debug!(error = %err, "uncacheable update range");
                None
            }
        };

        if let Some(key) = key.as_deref() {
            if let Some(records) = self
                .cache
                .get_json::<Vec<UpdateRecord>>(Namespace::Updates, key)
                .await
            {
                return Ok(records);
            }
        }

        let query = Query::new()
            .filter(Filter::new("version", FilterOp::Gt, from))
            .filter(Filter::new("version", FilterOp::Lte, to))
            .order_by(OrderBy::new("version", SortDirection::Ascending));
        query
            .validate()
            .map_err(store_failure(kind, "fetch updates"))?;

        let records = self
            .store
            .query(kind.updates_collection(), &query)
            .await
            .map_err(store_failure(kind, "fetch updates"))?
            .into_iter()
            .map(decode_update)
            .collect::<Result<Vec<_>, _>>()
            .map_err(store_failure(kind, "fetch updates"))?;

        if let Some(key) = key.as_deref() {
            let settled = self
                .stored_version(kind)
                .await?
                .is_some_and(|current| to <= current.version);
            if settled {
                self.cache.put_json(Namespace::Updates, key, &records).await;
            }
        }

        Ok(records)
    }

    async fn stored_version(&self, kind: RecordKind) -> Result<Option<FeedVersion>, AppError> {
        self.store
            .get(METADATA_COLLECTION, kind.version_document())
            .await
            .map_err(store_failure(kind, "read version"))?
            .map(decode_version)
            .transpose()
            .map_err(store_failure(kind, "read version"))
    }

    /// Insert the initial counter unless a concurrent caller already did.
    async fn initialise(&self, kind: RecordKind) -> Result<FeedVersion, AppError> {
        let mut body = Map::new();
        body.insert("version".to_string(), json!(INITIAL_VERSION.to_string()));
        let document = Document::new(kind.version_document(), body);

        match self.store.insert(METADATA_COLLECTION, document).await {
            Ok(()) => {
                debug!(kind = %kind, "version counter initialised");
                Ok(FeedVersion {
                    version: INITIAL_VERSION,
                })
            }
            Err(StoreError::AlreadyExists) => self
                .stored_version(kind)
                .await?
                .ok_or_else(|| store_failure(kind, "read version")(StoreError::NotFound)),
            Err(err) => Err(store_failure(kind, "initialise version")(err)),
        }
    }
}

fn decode_version(document: Document) -> Result<FeedVersion, StoreError> {
    let Document { id, body } = document;
    serde_json::from_value(Value::Object(body)).map_err(|err| StoreError::decode(id, err))
}

fn decode_update(document: Document) -> Result<UpdateRecord, StoreError> {
    let Document { id, mut body } = document;
    body.insert("id".to_string(), Value::String(id.clone()));
    serde_json::from_value(Value::Object(body)).map_err(|err| StoreError::decode(id, err))
}
