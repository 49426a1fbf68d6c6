use std::error::Error as StdError;

use thiserror::Error;

use crate::{
    application::{pagination::PaginationError, repos::StoreError},
    domain::error::DomainError,
    infra::error::InfraError,
};

/// Flattened error chain for logging at the process boundary.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub kind: ErrorKind,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &AppError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            kind: error.kind(),
            messages,
        }
    }
}

/// Coarse classification a transport layer maps onto its own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    MissingParameter,
    Validation,
    Collaborator,
    Infrastructure,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::MissingParameter => "missing_parameter",
            ErrorKind::Validation => "validation",
            ErrorKind::Collaborator => "collaborator",
            ErrorKind::Infrastructure => "infrastructure",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },
    #[error("missing required parameter `{name}`")]
    MissingParameter { name: &'static str },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{operation} failed")]
    Collaborator {
        operation: &'static str,
        #[source]
        source: StoreError,
    },
    #[error(transparent)]
    Infra(#[from] InfraError),
}

impl AppError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn missing(name: &'static str) -> Self {
        Self::MissingParameter { name }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn collaborator(operation: &'static str, source: StoreError) -> Self {
        Self::Collaborator { operation, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::NotFound { .. } => ErrorKind::NotFound,
            AppError::MissingParameter { .. } => ErrorKind::MissingParameter,
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::Collaborator { .. } => ErrorKind::Collaborator,
            AppError::Infra(_) => ErrorKind::Infrastructure,
        }
    }
}

impl From<DomainError> for AppError {
    fn from(error: DomainError) -> Self {
        AppError::Validation(error.to_string())
    }
}

impl From<PaginationError> for AppError {
    fn from(error: PaginationError) -> Self {
        AppError::Validation(error.to_string())
    }
}
