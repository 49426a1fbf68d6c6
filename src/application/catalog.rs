//! Catalog service: the operation surface for one record kind.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, instrument};

use crate::application::error::AppError;
use crate::application::pagination::{ListPage, PageRequest, PageWindow, SearchPage};
use crate::application::read_path::CacheAsideReadPath;
use crate::application::records::{RecordStore, decode};
use crate::application::repos::{Document, DocumentStore, Filter, OrderBy, StoreError};
use crate::application::search::SearchCriteria;
use crate::application::store_failure;
use crate::cache::InvalidationPolicy;
use crate::config::PaginationSettings;
use crate::domain::entities::{Cutoff, Record};
use crate::domain::types::SortDirection;

/// Acknowledgement returned by a successful delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteConfirmation {
    pub id: String,
    pub message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InstituteCodeKey<'a> {
    scope: &'static str,
    institute_code: &'a str,
}

pub struct CatalogService<R> {
    records: RecordStore<R>,
    reads: CacheAsideReadPath<R>,
    invalidation: InvalidationPolicy,
    pagination: PaginationSettings,
}

impl<R: Record> CatalogService<R> {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        invalidation: InvalidationPolicy,
        pagination: PaginationSettings,
    ) -> Self {
        let records = RecordStore::new(store);
        Self {
            reads: CacheAsideReadPath::new(records.clone(), invalidation.clone()),
            records,
            invalidation,
            pagination,
        }
    }

    /// Store a new record. An `id` in the payload selects the document id and
    /// replaces any record already stored under it.
    #[instrument(skip(self, payload), fields(kind = %R::KIND))]
    pub async fn create(&self, payload: Value) -> Result<R, AppError> {
        let Value::Object(mut body) = payload else {
            return Err(AppError::validation("payload must be a JSON object"));
        };
        let id = match body.remove("id") {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) if !id.trim().is_empty() => Some(id),
            Some(_) => return Err(AppError::validation("`id` must be a non-empty string")),
        };

        let candidate = checked::<R>(id.as_deref().unwrap_or_default(), body.clone())?;
        let body = crate::application::records::encode(&candidate)
            .map_err(store_failure(R::KIND, "create record"))?;

        let id = self
            .records
            .create(id.as_deref(), body.clone())
            .await
            .map_err(store_failure(R::KIND, "create record"))?;

        self.invalidation.record_written(R::KIND, &id).await;
        info!(kind = %R::KIND, id = %id, "record created");

        decode::<R>(Document::new(id, body)).map_err(store_failure(R::KIND, "create record"))
    }

    pub async fn get_by_id(&self, id: &str) -> Result<R, AppError> {
        self.reads.get_by_id(id).await
    }

    pub async fn list(
        &self,
        page: Option<u32>,
        limit: Option<u32>,
        cursor: Option<String>,
    ) -> Result<ListPage<R>, AppError> {
        let window = PageWindow::resolve(page, limit, &self.pagination)?;
        self.reads.list(&PageRequest::new(window, cursor)).await
    }

    /// Shallow-merge `patch` into the stored record and return the result.
    ///
    /// The merged record must still validate; nothing is written otherwise.
    #[instrument(skip(self, patch), fields(kind = %R::KIND))]
    pub async fn update(&self, id: &str, patch: Value) -> Result<R, AppError> {
        let Value::Object(mut patch) = patch else {
            return Err(AppError::validation("patch must be a JSON object"));
        };
        match patch.remove("id") {
            None => {}
            Some(Value::String(patched)) if patched == id => {}
            Some(_) => return Err(AppError::validation("`id` cannot be changed")),
        }

        let current = self
            .records
            .get_document(id)
            .await
            .map_err(store_failure(R::KIND, "update record"))?
            .ok_or_else(|| AppError::not_found(R::KIND.entity(), id))?;

        let mut merged = current.body;
        merged.extend(patch.clone());
        checked::<R>(id, merged)?;

        match self.records.update(id, patch).await {
            Ok(()) => {}
            Err(StoreError::NotFound) => return Err(AppError::not_found(R::KIND.entity(), id)),
            Err(err) => return Err(store_failure(R::KIND, "update record")(err)),
        }
        // The write is durable from here on, whatever the re-read does.
        self.invalidation.record_written(R::KIND, id).await;
        info!(kind = %R::KIND, id, "record updated");

        self.records
            .get(id)
            .await
            .map_err(store_failure(R::KIND, "update record"))?
            .ok_or_else(|| AppError::not_found(R::KIND.entity(), id))
    }

    #[instrument(skip(self), fields(kind = %R::KIND))]
    pub async fn delete(&self, id: &str) -> Result<DeleteConfirmation, AppError> {
        let exists = self
            .records
            .exists(id)
            .await
            .map_err(store_failure(R::KIND, "delete record"))?;
        if !exists {
            return Err(AppError::not_found(R::KIND.entity(), id));
        }

        match self.records.delete(id).await {
            Ok(()) => {}
            Err(StoreError::NotFound) => return Err(AppError::not_found(R::KIND.entity(), id)),
            Err(err) => return Err(store_failure(R::KIND, "delete record")(err)),
        }

        self.invalidation.record_written(R::KIND, id).await;
        info!(kind = %R::KIND, id, "record deleted");
        Ok(DeleteConfirmation {
            id: id.to_string(),
            message: format!("{} deleted successfully", R::KIND.label()),
        })
    }

    pub async fn search<C>(
        &self,
        criteria: &C,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<SearchPage<R>, AppError>
    where
        C: SearchCriteria,
    {
        let window = PageWindow::resolve(page, limit, &self.pagination)?;
        self.reads.search(criteria, window).await
    }
}

impl CatalogService<Cutoff> {
    /// Every cutoff published for an institute code, newest year first.
    pub async fn by_institute_code(&self, code: &str) -> Result<Vec<Cutoff>, AppError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AppError::missing("instituteCode"));
        }

        let params = InstituteCodeKey {
            scope: "by_institute_code",
            institute_code: code,
        };
        self.reads
            .find_all(
                &params,
                vec![Filter::eq("instituteCode", code)],
                Some(OrderBy::new("year", SortDirection::Descending)),
            )
            .await
    }
}

/// Decode and validate a candidate body as a record of type `R`.
fn checked<R: Record>(id: &str, body: Map<String, Value>) -> Result<R, AppError> {
    let record = decode::<R>(Document::new(id, body)).map_err(|err| match err {
        StoreError::Decode { message, .. } => AppError::validation(message),
        other => AppError::validation(other.to_string()),
    })?;
    record.validate()?;
    Ok(record)
}
