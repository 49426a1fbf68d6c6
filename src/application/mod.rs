//! Catalog services: typed records over the document store, read through the
//! cache layer.

pub mod catalog;
pub mod error;
pub mod feed;
pub mod pagination;
pub mod read_path;
pub mod records;
pub mod repos;
pub mod search;

use tracing::error;

use crate::application::error::AppError;
use crate::application::repos::StoreError;
use crate::domain::types::RecordKind;

/// Log a document store failure and wrap it for the caller.
pub(crate) fn store_failure(
    kind: RecordKind,
    operation: &'static str,
) -> impl FnOnce(StoreError) -> AppError {
    move |err| {
        error!(kind = %kind, operation, error = %err, "document store call failed");
        AppError::collaborator(operation, err)
    }
}
