use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("field `{field}` is required")]
    MissingField { field: &'static str },
    #[error("field `{field}` is out of range: {reason}")]
    OutOfRange { field: &'static str, reason: String },
    #[error("domain validation failed: {message}")]
    Validation { message: String },
}

impl DomainError {
    pub fn missing(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    pub fn out_of_range(field: &'static str, reason: impl Into<String>) -> Self {
        Self::OutOfRange {
            field,
            reason: reason.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
