//! Two-stage record search.
//!
//! Equality predicates are pushed down to the document store. A free-text
//! name query cannot be indexed, so the equality-filtered set is fetched in
//! full and matched in memory before it is paginated. Totals therefore
//! describe the complete match set.

use serde::{Deserialize, Serialize};

use crate::application::pagination::{PageWindow, SearchPage, paginate};
use crate::application::records::RecordStore;
use crate::application::repos::{Filter, StoreError};
use crate::domain::entities::Record;
use crate::domain::types::RecordState;

/// Type-specific search input.
///
/// The serialized form feeds the cache key, so two criteria values with the
/// same populated fields produce the same key.
pub trait SearchCriteria: Serialize + Send + Sync {
    /// Equality predicates evaluated by the store.
    fn predicates(&self) -> Vec<Filter>;

    /// Free-text query matched in memory, if any.
    fn text_query(&self) -> Option<&str> {
        None
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstitutionCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub institute_code: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub branch_name: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RecordState>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub institute_name: Option<String>,
}

impl SearchCriteria for InstitutionCriteria {
    fn predicates(&self) -> Vec<Filter> {
        let mut filters = Vec::new();
        if let Some(year) = self.year {
            filters.push(Filter::eq("year", year));
        }
        push_text(&mut filters, "instituteCode", &self.institute_code);
        push_text(&mut filters, "category", &self.category);
        push_text(&mut filters, "branchName", &self.branch_name);
        push_text(&mut filters, "city", &self.city);
        if let Some(state) = self.status {
            filters.push(Filter::eq("status.state", state.as_str()));
        }
        filters
    }

    fn text_query(&self) -> Option<&str> {
        self.institute_name.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CutoffCriteria {
    #[serde(default, skip_serializing_if = "is_blank")]
    pub college_id: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub institute_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub branch_name: Option<String>,
}

impl SearchCriteria for CutoffCriteria {
    fn predicates(&self) -> Vec<Filter> {
        let mut filters = Vec::new();
        push_text(&mut filters, "collegeId", &self.college_id);
        push_text(&mut filters, "instituteCode", &self.institute_code);
        if let Some(year) = self.year {
            filters.push(Filter::eq("year", year));
        }
        if let Some(round) = self.round {
            filters.push(Filter::eq("round", round));
        }
        push_text(&mut filters, "category", &self.category);
        push_text(&mut filters, "branchName", &self.branch_name);
        filters
    }
}

/// Blank text criteria neither filter nor take part in the cache key.
fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|value| value.trim().is_empty())
}

fn push_text(filters: &mut Vec<Filter>, field: &str, value: &Option<String>) {
    if let Some(value) = value.as_deref().filter(|value| !value.trim().is_empty()) {
        filters.push(Filter::eq(field, value));
    }
}

/// Lower-cased free-text query split into whitespace tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextQuery {
    phrase: String,
    tokens: Vec<String>,
}

impl TextQuery {
    /// `None` for an absent or blank query, which matches everything.
    pub fn parse(raw: &str) -> Option<Self> {
        let phrase = raw.trim().to_lowercase();
        if phrase.is_empty() {
            return None;
        }
        let tokens = phrase.split_whitespace().map(str::to_string).collect();
        Some(Self { phrase, tokens })
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Any token inside any keyword, or the whole phrase inside the name.
    pub fn matches(&self, name: Option<&str>, keywords: &[String]) -> bool {
        let keyword_hit = keywords.iter().any(|keyword| {
            let keyword = keyword.to_lowercase();
            self.tokens.iter().any(|token| keyword.contains(token.as_str()))
        });
        keyword_hit
            || name.is_some_and(|name| name.to_lowercase().contains(self.phrase.as_str()))
    }

    pub fn matches_record<R: Record>(&self, record: &R) -> bool {
        self.matches(record.display_name(), record.keywords())
    }
}

pub struct SearchFilterEngine<R> {
    records: RecordStore<R>,
}

impl<R> Clone for SearchFilterEngine<R> {
    fn clone(&self) -> Self {
        Self {
            records: self.records.clone(),
        }
    }
}

impl<R: Record> SearchFilterEngine<R> {
    pub fn new(records: RecordStore<R>) -> Self {
        Self { records }
    }

    pub async fn run<C>(&self, criteria: &C, window: PageWindow) -> Result<SearchPage<R>, StoreError>
    where
        C: SearchCriteria + ?Sized,
    {
        let candidates = self.records.filtered(criteria.predicates(), None).await?;
        let matched = match criteria.text_query().and_then(TextQuery::parse) {
            Some(query) => candidates
                .into_iter()
                .filter(|record| query.matches_record(record))
                .collect(),
            None => candidates,
        };
        Ok(paginate(matched, window))
    }
}
