//! Shared cursor and offset pagination helpers.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::PaginationSettings;
use crate::domain::types::RecordKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RecordCursorPayload {
    kind: RecordKind,
    id: String,
}

/// Reference to the last record returned by an ordered scan.
///
/// The cursor names the record rather than its sort key, so resuming requires
/// the record to still exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordCursor {
    kind: RecordKind,
    id: String,
}

impl RecordCursor {
    pub fn new(kind: RecordKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn encode(&self) -> String {
        let payload = RecordCursorPayload {
            kind: self.kind,
            id: self.id.clone(),
        };
        let serialized =
            serde_json::to_vec(&payload).expect("serializing record cursor payload should succeed");
        URL_SAFE_NO_PAD.encode(serialized)
    }

    pub fn decode(cursor: &str) -> Result<Self, PaginationError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(cursor)
            .map_err(|err| PaginationError::InvalidCursor(err.to_string()))?;
        let payload: RecordCursorPayload = serde_json::from_slice(&bytes)
            .map_err(|err| PaginationError::InvalidCursor(err.to_string()))?;
        if payload.id.is_empty() {
            return Err(PaginationError::InvalidCursor(
                "cursor does not reference a record".to_string(),
            ));
        }
        Ok(Self {
            kind: payload.kind,
            id: payload.id,
        })
    }

    /// Decode a cursor and ensure it was issued for `kind`.
    pub fn decode_for(kind: RecordKind, cursor: &str) -> Result<Self, PaginationError> {
        let decoded = Self::decode(cursor)?;
        if decoded.kind != kind {
            return Err(PaginationError::InvalidCursor(format!(
                "cursor was issued for {} not {kind}",
                decoded.kind
            )));
        }
        Ok(decoded)
    }
}

/// Validated page/limit pair. Both values are at least 1; [`resolve`] is the
/// only constructor.
///
/// [`resolve`]: PageWindow::resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    page: u32,
    limit: u32,
}

impl PageWindow {
    /// Apply defaults, reject zero values and clamp the limit to the configured
    /// ceiling.
    pub fn resolve(
        page: Option<u32>,
        limit: Option<u32>,
        settings: &PaginationSettings,
    ) -> Result<Self, PaginationError> {
        let page = page.unwrap_or(1);
        if page == 0 {
            return Err(PaginationError::InvalidPage);
        }
        let limit = limit.unwrap_or(settings.default_limit.get());
        if limit == 0 {
            return Err(PaginationError::InvalidLimit);
        }
        Ok(Self {
            page,
            limit: limit.min(settings.max_limit.get()),
        })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> usize {
        (self.page as usize)
            .saturating_sub(1)
            .saturating_mul(self.limit as usize)
    }
}

/// Cursor-aware list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub window: PageWindow,
    pub cursor: Option<String>,
}

impl PageRequest {
    pub fn new(window: PageWindow, cursor: Option<String>) -> Self {
        Self { window, cursor }
    }
}

/// One page of an ordered scan.
///
/// `has_more` is inferred from the page being full, so a final page that
/// exactly fills `page_size` still reports more.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
    pub current_page: u32,
    pub page_size: u32,
    pub has_more: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationSummary {
    pub total: usize,
    pub current_page: u32,
    pub page_size: u32,
    pub total_pages: usize,
    pub has_more: bool,
}

/// Offset page over a fully materialised result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage<T> {
    pub items: Vec<T>,
    pub pagination: PaginationSummary,
}

/// Slice `items` to the requested window; totals describe the whole set.
pub fn paginate<T>(items: Vec<T>, window: PageWindow) -> SearchPage<T> {
    let total = items.len();
    let limit = window.limit as usize;
    let start = window.offset();
    let summary = PaginationSummary {
        total,
        current_page: window.page,
        page_size: window.limit,
        total_pages: total.div_ceil(limit.max(1)),
        has_more: start.saturating_add(limit) < total,
    };
    let items = items.into_iter().skip(start).take(limit).collect();
    SearchPage {
        items,
        pagination: summary,
    }
}

#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
    #[error("page must be at least 1")]
    InvalidPage,
    #[error("limit must be at least 1")]
    InvalidLimit,
}
