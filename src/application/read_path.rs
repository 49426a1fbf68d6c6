//! Cache-aside reads.
//!
//! Each read checks the cache first, falls back to the document store on a
//! miss and writes the result back with its namespace TTL. Write-back always
//! follows the store read it reflects. Concurrent misses on one key each
//! recompute and overwrite the entry, which is idempotent.

use serde::Serialize;
use tracing::{debug, instrument};

use crate::application::error::AppError;
use crate::application::pagination::{ListPage, PageRequest, PageWindow, RecordCursor, SearchPage};
use crate::application::records::RecordStore;
use crate::application::repos::{Filter, OrderBy};
use crate::application::search::{SearchCriteria, SearchFilterEngine};
use crate::application::store_failure;
use crate::cache::{CacheAdapter, InvalidationPolicy, Namespace, degraded};
use crate::domain::entities::Record;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListKey<'a> {
    page: u32,
    limit: u32,
    cursor: Option<&'a str>,
}

#[derive(Serialize)]
struct SearchKey<'a, C> {
    criteria: &'a C,
    page: u32,
    limit: u32,
}

pub struct CacheAsideReadPath<R> {
    records: RecordStore<R>,
    search: SearchFilterEngine<R>,
    cache: CacheAdapter,
    invalidation: InvalidationPolicy,
}

impl<R: Record> CacheAsideReadPath<R> {
    pub fn new(records: RecordStore<R>, invalidation: InvalidationPolicy) -> Self {
        Self {
            search: SearchFilterEngine::new(records.clone()),
            cache: invalidation.cache().clone(),
            records,
            invalidation,
        }
    }

    #[instrument(skip(self), fields(kind = %R::KIND))]
    pub async fn get_by_id(&self, id: &str) -> Result<R, AppError> {
        let key = self.cache.keys().detail(R::KIND, id);
        if let Some(record) = self.cache.get_json::<R>(Namespace::Detail, &key).await {
            return Ok(record);
        }

        let record = self
            .records
            .get(id)
            .await
            .map_err(store_failure(R::KIND, "get record"))?
            .ok_or_else(|| AppError::not_found(R::KIND.entity(), id))?;

        self.cache.put_json(Namespace::Detail, &key, &record).await;
        Ok(record)
    }

    /// One page of the natural order, resuming after the cursor's record.
    ///
    /// `has_more` is true whenever the page came back full, including the
    /// case where it happens to hold the last records.
    #[instrument(skip(self, request), fields(kind = %R::KIND, page = request.window.page(), limit = request.window.limit()))]
    pub async fn list(&self, request: &PageRequest) -> Result<ListPage<R>, AppError> {
        let cursor = request
            .cursor
            .as_deref()
            .map(|raw| RecordCursor::decode_for(R::KIND, raw))
            .transpose()?;

        let params = ListKey {
            page: request.window.page(),
            limit: request.window.limit(),
            cursor: request.cursor.as_deref(),
        };
        let key = self.collection_key(Namespace::List, &params).await;
        if let Some(key) = key.as_deref() {
            if let Some(page) = self.cache.get_json::<ListPage<R>>(Namespace::List, key).await {
                return Ok(page);
            }
        }

        let after = match cursor {
            Some(cursor) => Some(
                self.records
                    .get_document(cursor.id())
                    .await
                    .map_err(store_failure(R::KIND, "resolve cursor"))?
                    .ok_or_else(|| AppError::not_found(R::KIND.entity(), cursor.id()))?,
            ),
            None => None,
        };

        let limit = request.window.limit();
        let items = self
            .records
            .page_after(after, limit)
            .await
            .map_err(store_failure(R::KIND, "list records"))?;

        let page = ListPage {
            next_cursor: items
                .last()
                .map(|record| RecordCursor::new(R::KIND, record.id()).encode()),
            has_more: items.len() == limit as usize,
            current_page: request.window.page(),
            page_size: limit,
            items,
        };

        if let Some(key) = key.as_deref() {
            self.cache.put_json(Namespace::List, key, &page).await;
        }
        Ok(page)
    }

    #[instrument(skip(self, criteria), fields(kind = %R::KIND, page = window.page(), limit = window.limit()))]
    pub async fn search<C>(&self, criteria: &C, window: PageWindow) -> Result<SearchPage<R>, AppError>
    where
        C: SearchCriteria,
    {
        let key = if self.cache.config().search_reads_enabled {
            let params = SearchKey {
                criteria,
                page: window.page(),
                limit: window.limit(),
            };
            self.collection_key(Namespace::Search, &params).await
        } else {
            None
        };

        if let Some(key) = key.as_deref() {
            if let Some(page) = self.cache.get_json::<SearchPage<R>>(Namespace::Search, key).await {
                return Ok(page);
            }
        }

        let page = self
            .search
            .run(criteria, window)
            .await
            .map_err(store_failure(R::KIND, "search records"))?;

        if let Some(key) = key.as_deref() {
            self.cache.put_json(Namespace::Search, key, &page).await;
        }
        Ok(page)
    }

    /// Every record matching `filters`, cached in the search namespace under
    /// `params`.
    #[instrument(skip(self, params, filters, order), fields(kind = %R::KIND))]
    pub async fn find_all<P>(
        &self,
        params: &P,
        filters: Vec<Filter>,
        order: Option<OrderBy>,
    ) -> Result<Vec<R>, AppError>
    where
        P: Serialize,
    {
        let key = if self.cache.config().search_reads_enabled {
            self.collection_key(Namespace::Search, params).await
        } else {
            None
        };

        if let Some(key) = key.as_deref() {
            if let Some(records) = self.cache.get_json::<Vec<R>>(Namespace::Search, key).await {
                return Ok(records);
            }
        }

        let records = self
            .records
            .filtered(filters, order)
            .await
            .map_err(store_failure(R::KIND, "search records"))?;

        if let Some(key) = key.as_deref() {
            self.cache.put_json(Namespace::Search, key, &records).await;
        }
        Ok(records)
    }

    /// Key for a list or search entry, or `None` when the cache must be
    /// bypassed for this read.
    async fn collection_key<P>(&self, namespace: Namespace, params: &P) -> Option<String>
    where
        P: Serialize + ?Sized,
    {
        if !self.cache.is_enabled() {
            return None;
        }

        let generation = match self.invalidation.collection_generation(R::KIND).await {
            Ok(generation) => generation,
            Err(err) => {
                let tag_key = self.cache.keys().generation(R::KIND);
                degraded(namespace, "generation", &tag_key, &err);
                return None;
            }
        };

        match self
            .cache
            .keys()
            .build_tagged_key(R::KIND, namespace, params, generation.as_deref())
        {
            Ok(key) => Some(key),
            Err(err) => {
                debug!(namespace = namespace.as_str(), error = %err, "uncacheable parameters");
                None
            }
        }
    }
}
