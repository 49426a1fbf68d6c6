//! Typed access to one record collection of the document store.

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::application::repos::{Document, DocumentStore, Filter, OrderBy, Query, StoreError};
use crate::domain::entities::Record;

/// Decode a stored document into its record type; the document id wins over
/// any `id` attribute in the body.
pub fn decode<R: Record>(document: Document) -> Result<R, StoreError> {
    let Document { id, mut body } = document;
    body.insert("id".to_string(), Value::String(id.clone()));
    serde_json::from_value(Value::Object(body)).map_err(|err| StoreError::decode(id, err))
}

/// Attribute map persisted for a record, without its id.
pub fn encode<R: Record>(record: &R) -> Result<Map<String, Value>, StoreError> {
    match serde_json::to_value(record) {
        Ok(Value::Object(mut body)) => {
            body.remove("id");
            Ok(body)
        }
        Ok(_) => Err(StoreError::decode(
            record.id(),
            "record did not serialize to an object",
        )),
        Err(err) => Err(StoreError::decode(record.id(), err)),
    }
}

pub struct RecordStore<R> {
    store: Arc<dyn DocumentStore>,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for RecordStore<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _record: PhantomData,
        }
    }
}

impl<R: Record> RecordStore<R> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    fn collection(&self) -> &'static str {
        R::KIND.collection()
    }

    pub async fn get_document(&self, id: &str) -> Result<Option<Document>, StoreError> {
        self.store.get(self.collection(), id).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<R>, StoreError> {
        self.get_document(id).await?.map(decode::<R>).transpose()
    }

    pub async fn exists(&self, id: &str) -> Result<bool, StoreError> {
        self.store.exists(self.collection(), id).await
    }

    /// Persist a new record body. A caller-chosen id replaces any document
    /// already stored under it; otherwise the store assigns one.
    pub async fn create(
        &self,
        id: Option<&str>,
        body: Map<String, Value>,
    ) -> Result<String, StoreError> {
        match id {
            Some(id) => {
                self.store
                    .upsert(self.collection(), Document::new(id, body))
                    .await?;
                Ok(id.to_string())
            }
            None => self.store.add(self.collection(), body).await,
        }
    }

    pub async fn update(&self, id: &str, patch: Map<String, Value>) -> Result<(), StoreError> {
        self.store.update(self.collection(), id, patch).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete(self.collection(), id).await
    }

    /// One page of the record type's natural order, resuming after `after`.
    pub async fn page_after(
        &self,
        after: Option<Document>,
        limit: u32,
    ) -> Result<Vec<R>, StoreError> {
        let mut query = Query::new()
            .order_by(OrderBy::new(R::ORDER_FIELD, R::ORDER_DIRECTION))
            .limit(limit);
        if let Some(document) = after {
            query = query.start_after(document);
        }
        self.run(&query).await
    }

    /// Every record matching all `filters`.
    pub async fn filtered(
        &self,
        filters: Vec<Filter>,
        order: Option<OrderBy>,
    ) -> Result<Vec<R>, StoreError> {
        let mut query = Query::new().filters(filters);
        if let Some(order) = order {
            query = query.order_by(order);
        }
        self.run(&query).await
    }

    async fn run(&self, query: &Query) -> Result<Vec<R>, StoreError> {
        query.validate()?;
        self.store
            .query(self.collection(), query)
            .await?
            .into_iter()
            .map(decode::<R>)
            .collect()
    }
}
