//! Document store contract consumed by the catalog.
//!
//! Queries are described up front as a [`Query`] value and translated once by
//! each adapter, rather than assembled through a chained builder.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::types::SortDirection;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("document not found")]
    NotFound,
    #[error("document already exists")]
    AlreadyExists,
    #[error("invalid query: {message}")]
    InvalidQuery { message: String },
    #[error("document `{id}` could not be decoded: {message}")]
    Decode { id: String, message: String },
    #[error("store timeout")]
    Timeout,
}

impl StoreError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    pub fn decode(id: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            id: id.into(),
            message: err.to_string(),
        }
    }
}

/// A stored document: an opaque id plus its attribute map.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub body: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, body: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            body,
        }
    }

    /// Resolve a dotted field path (`status.state`) against the body.
    pub fn field(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.body.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl FilterOp {
    pub fn is_inequality(self) -> bool {
        !matches!(self, FilterOp::Eq)
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
        }
    }

    /// Whether a stored value comparing as `ordering` against the filter
    /// operand satisfies this operator.
    pub fn accepts(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};
        match self {
            FilterOp::Eq => ordering == Equal,
            FilterOp::Gt => ordering == Greater,
            FilterOp::Gte => ordering != Less,
            FilterOp::Lt => ordering == Less,
            FilterOp::Lte => ordering != Greater,
        }
    }
}

/// A single `field op value` predicate. Fields may be dotted paths.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// Conjunctive query over one collection.
///
/// Without an explicit order, results come back in ascending document id
/// order. With one, documents lacking the order field are excluded and ties
/// are broken by document id in the same direction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<OrderBy>,
    pub limit: Option<u32>,
    pub start_after: Option<Document>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order = Some(order);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn start_after(mut self, document: Document) -> Self {
        self.start_after = Some(document);
        self
    }

    /// Reject shapes the store contract does not support: inequality bounds on
    /// more than one field, or a start-after reference without an ordering.
    pub fn validate(&self) -> Result<(), StoreError> {
        let mut inequality_field: Option<&str> = None;
        for filter in self.filters.iter().filter(|filter| filter.op.is_inequality()) {
            match inequality_field {
                Some(field) if field != filter.field => {
                    return Err(StoreError::invalid_query(format!(
                        "inequality filters on both `{field}` and `{}`",
                        filter.field
                    )));
                }
                _ => inequality_field = Some(&filter.field),
            }
        }

        if self.start_after.is_some() && self.order.is_none() {
            return Err(StoreError::invalid_query(
                "start_after requires an explicit ordering",
            ));
        }

        Ok(())
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    async fn exists(&self, collection: &str, id: &str) -> Result<bool, StoreError>;

    /// Create or fully replace the document with the given id.
    async fn upsert(&self, collection: &str, document: Document) -> Result<(), StoreError>;

    /// Create the document only if the id is free; `AlreadyExists` otherwise.
    async fn insert(&self, collection: &str, document: Document) -> Result<(), StoreError>;

    /// Create a document under a store-generated id and return that id.
    async fn add(&self, collection: &str, body: Map<String, Value>) -> Result<String, StoreError>;

    /// Shallow-merge `patch` into an existing document; `NotFound` if absent.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<(), StoreError>;

    /// Remove a document; `NotFound` if absent.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError>;
}
