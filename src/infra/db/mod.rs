//! Postgres-backed document store.
//!
//! Every collection lives in one `documents` table keyed by
//! `(collection, id)` with the attributes in a `jsonb` body. Dotted field
//! paths become `body #> '{a,b}'` lookups, so filters and ordering compare
//! `jsonb` values directly.

mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{
    Postgres, QueryBuilder,
    postgres::{PgPool, PgPoolOptions},
    query, query_as, query_scalar,
    types::Json,
};
use uuid::Uuid;

use crate::application::repos::{Document, DocumentStore, Query, StoreError};
use crate::domain::types::SortDirection;

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: String,
    body: Json<Map<String, Value>>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Document::new(row.id, row.body.0)
    }
}

#[derive(Clone)]
pub struct PostgresDocumentStore {
    pool: Arc<PgPool>,
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }
}

fn field_path(field: &str) -> Vec<String> {
    field.split('.').map(str::to_string).collect()
}

fn push_field<'q>(qb: &mut QueryBuilder<'q, Postgres>, field: &str) {
    qb.push("(body #> ");
    qb.push_bind(field_path(field));
    qb.push(")");
}

/// Translate a validated [`Query`] into a single `SELECT`.
fn build_select(collection: &str, query: &Query) -> Result<QueryBuilder<'static, Postgres>, StoreError> {
    let mut qb = QueryBuilder::new("SELECT id, body FROM documents WHERE collection = ");
    qb.push_bind(collection.to_string());

    for filter in &query.filters {
        qb.push(" AND jsonb_typeof");
        push_field(&mut qb, &filter.field);
        qb.push(" = jsonb_typeof(");
        qb.push_bind(Json(filter.value.clone()));
        qb.push(") AND ");
        push_field(&mut qb, &filter.field);
        qb.push(" ");
        qb.push(filter.op.as_sql());
        qb.push(" ");
        qb.push_bind(Json(filter.value.clone()));
    }

    match query.order.as_ref() {
        Some(order) => {
            qb.push(" AND coalesce(jsonb_typeof");
            push_field(&mut qb, &order.field);
            qb.push(", 'null') <> 'null'");

            if let Some(anchor) = query.start_after.as_ref() {
                let value = anchor
                    .field(&order.field)
                    .filter(|value| !value.is_null())
                    .ok_or_else(|| {
                        StoreError::invalid_query(format!(
                            "start_after document `{}` has no `{}` value",
                            anchor.id, order.field
                        ))
                    })?;
                qb.push(" AND (");
                push_field(&mut qb, &order.field);
                qb.push(", id) ");
                qb.push(match order.direction {
                    SortDirection::Ascending => ">",
                    SortDirection::Descending => "<",
                });
                qb.push(" (");
                qb.push_bind(Json(value.clone()));
                qb.push(", ");
                qb.push_bind(anchor.id.clone());
                qb.push(")");
            }

            let direction = order.direction.as_sql();
            qb.push(" ORDER BY ");
            push_field(&mut qb, &order.field);
            qb.push(" ");
            qb.push(direction);
            qb.push(", id ");
            qb.push(direction);
        }
        None => {
            qb.push(" ORDER BY id ASC");
        }
    }

    if let Some(limit) = query.limit {
        qb.push(" LIMIT ");
        qb.push_bind(i64::from(limit));
    }

    Ok(qb)
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let row = query_as::<_, DocumentRow>(
            "SELECT id, body FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Document::from))
    }

    async fn exists(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM documents WHERE collection = $1 AND id = $2)",
        )
        .bind(collection)
        .bind(id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn upsert(&self, collection: &str, document: Document) -> Result<(), StoreError> {
        query(
            r#"
            INSERT INTO documents (collection, id, body)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id)
            DO UPDATE SET body = EXCLUDED.body, updated_at = now()
            "#,
        )
        .bind(collection)
        .bind(&document.id)
        .bind(Json(&document.body))
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn insert(&self, collection: &str, document: Document) -> Result<(), StoreError> {
        let result = query(
            r#"
            INSERT INTO documents (collection, id, body)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id) DO NOTHING
            "#,
        )
        .bind(collection)
        .bind(&document.id)
        .bind(Json(&document.body))
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists);
        }
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
        let result = query(
            r#"
            UPDATE documents
            SET body = body || $3, updated_at = now()
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Json(&patch))
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let result = query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        query.validate()?;
        let mut qb = build_select(collection, query)?;
        let rows = qb
            .build_query_as::<DocumentRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Document::from).collect())
    }
}
