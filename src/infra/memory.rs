//! In-process document store.
//!
//! Used when no database is configured and as the backing store in tests.
//! Value ordering follows the Postgres `jsonb` rules so both adapters return
//! the same pages for the same query.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::application::repos::{Document, DocumentStore, Query, StoreError};
use crate::domain::types::SortDirection;

type Collection = BTreeMap<String, Map<String, Value>>;

#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in `collection`.
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(collection)
            .and_then(|documents| documents.get(id))
            .map(|body| Document::new(id, body.clone())))
    }

    async fn exists(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(collection)
            .is_some_and(|documents| documents.contains_key(id)))
    }

    async fn upsert(&self, collection: &str, document: Document) -> Result<(), StoreError> {
        let mut guard = self.collections.write().await;
        guard
            .entry(collection.to_string())
            .or_default()
            .insert(document.id, document.body);
        Ok(())
    }

    async fn insert(&self, collection: &str, document: Document) -> Result<(), StoreError> {
        let mut guard = self.collections.write().await;
        let documents = guard.entry(collection.to_string()).or_default();
        if documents.contains_key(&document.id) {
            return Err(StoreError::AlreadyExists);
        }
        documents.insert(document.id, document.body);
        Ok(())
    }

    async fn add(&self, collection: &str, body: Map<String, Value>) -> Result<String, StoreError> {
        let id = Uuid::new_v4().simple().to_string();
        self.insert(collection, Document::new(id.clone(), body))
            .await?;
        Ok(id)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<(), StoreError> {
        let mut guard = self.collections.write().await;
        let body = guard
            .get_mut(collection)
            .and_then(|documents| documents.get_mut(id))
            .ok_or(StoreError::NotFound)?;
        body.extend(patch);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut guard = self.collections.write().await;
        guard
            .get_mut(collection)
            .and_then(|documents| documents.remove(id))
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        query.validate()?;

        let mut documents: Vec<Document> = {
            let guard = self.collections.read().await;
            let Some(stored) = guard.get(collection) else {
                return Ok(Vec::new());
            };
            stored
                .iter()
                .map(|(id, body)| Document::new(id.clone(), body.clone()))
                .filter(|document| matches_filters(document, query))
                .collect()
        };

        if let Some(order) = query.order.as_ref() {
            documents.retain(|document| is_orderable(document.field(&order.field)));
            documents.sort_by(|left, right| {
                directed(order.direction, position(left, right, &order.field))
            });

            if let Some(anchor) = query.start_after.as_ref() {
                if !is_orderable(anchor.field(&order.field)) {
                    return Err(StoreError::invalid_query(format!(
                        "start_after document `{}` has no `{}` value",
                        anchor.id, order.field
                    )));
                }
                documents.retain(|document| {
                    directed(order.direction, position(document, anchor, &order.field))
                        == Ordering::Greater
                });
            }
        }

        if let Some(limit) = query.limit {
            documents.truncate(limit as usize);
        }
        Ok(documents)
    }
}

fn matches_filters(document: &Document, query: &Query) -> bool {
    query.filters.iter().all(|filter| {
        document.field(&filter.field).is_some_and(|stored| {
            type_rank(stored) == type_rank(&filter.value)
                && filter.op.accepts(compare_values(stored, &filter.value))
        })
    })
}

fn is_orderable(value: Option<&Value>) -> bool {
    value.is_some_and(|value| !value.is_null())
}

/// Ascending position of `left` relative to `right`: the order field first,
/// then the document id.
fn position(left: &Document, right: &Document, field: &str) -> Ordering {
    let by_field = match (left.field(field), right.field(field)) {
        (Some(left), Some(right)) => compare_values(left, right),
        (left, right) => left.is_some().cmp(&right.is_some()),
    };
    by_field.then_with(|| left.id.cmp(&right.id))
}

fn directed(direction: SortDirection, ordering: Ordering) -> Ordering {
    match direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}

/// Cross-type rank: null < string < number < boolean < array < object.
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::String(_) => 1,
        Value::Number(_) => 2,
        Value::Bool(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::String(left), Value::String(right)) => left.cmp(right),
        (Value::Number(left), Value::Number(right)) => match (left.as_i64(), right.as_i64()) {
            (Some(left), Some(right)) => left.cmp(&right),
            _ => {
                let left = left.as_f64().unwrap_or(f64::NAN);
                let right = right.as_f64().unwrap_or(f64::NAN);
                left.partial_cmp(&right).unwrap_or(Ordering::Equal)
            }
        },
        (Value::Bool(left), Value::Bool(right)) => left.cmp(right),
        (Value::Array(left), Value::Array(right)) => left
            .iter()
            .zip(right.iter())
            .map(|(left, right)| compare_values(left, right))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| left.len().cmp(&right.len())),
        (Value::Object(left), Value::Object(right)) => left.len().cmp(&right.len()),
        (left, right) => type_rank(left).cmp(&type_rank(right)),
    }
}
