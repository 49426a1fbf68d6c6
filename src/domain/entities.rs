//! Domain records mirrored from the document store.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::domain::{
    error::DomainError,
    types::{RecordKind, RecordState, SortDirection},
};

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2100;

/// A record type stored in its own collection and served by the catalog.
///
/// The ordering field drives cursor pagination; ties are broken by document
/// id in the same direction so every record has exactly one position.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: RecordKind;
    const ORDER_FIELD: &'static str;
    const ORDER_DIRECTION: SortDirection;

    fn id(&self) -> &str;

    fn validate(&self) -> Result<(), DomainError>;

    /// Human readable name matched against free-text queries.
    fn display_name(&self) -> Option<&str> {
        None
    }

    /// Search keywords matched token by token against free-text queries.
    fn keywords(&self) -> &[String] {
        &[]
    }
}

/// Nested status metadata attached to a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusMeta {
    pub state: RecordState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Institution {
    #[serde(default)]
    pub id: String,
    pub institute_code: String,
    pub institute_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusMeta>,
    /// Attributes the catalog does not interpret, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record for Institution {
    const KIND: RecordKind = RecordKind::Institution;
    const ORDER_FIELD: &'static str = "instituteCode";
    const ORDER_DIRECTION: SortDirection = SortDirection::Ascending;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), DomainError> {
        ensure_non_empty(&self.institute_code, "instituteCode")?;
        ensure_non_empty(&self.institute_name, "instituteName")?;
        if let Some(year) = self.year {
            ensure_year(year)?;
        }
        if self.keywords.iter().any(|keyword| keyword.trim().is_empty()) {
            return Err(DomainError::validation("keywords must not contain blank entries"));
        }
        Ok(())
    }

    fn display_name(&self) -> Option<&str> {
        Some(&self.institute_name)
    }

    fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cutoff {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub college_id: Option<String>,
    pub institute_code: String,
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_rank: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing_rank: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusMeta>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record for Cutoff {
    const KIND: RecordKind = RecordKind::Cutoff;
    const ORDER_FIELD: &'static str = "year";
    const ORDER_DIRECTION: SortDirection = SortDirection::Descending;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), DomainError> {
        ensure_non_empty(&self.institute_code, "instituteCode")?;
        ensure_non_empty(&self.category, "category")?;
        ensure_year(self.year)?;
        match (self.opening_rank, self.closing_rank) {
            (Some(opening), Some(closing)) if opening > closing => Err(DomainError::out_of_range(
                "openingRank",
                format!("opening rank {opening} exceeds closing rank {closing}"),
            )),
            _ => Ok(()),
        }
    }
}

/// Current position of a record type's update feed.
///
/// The counter is exposed as a decimal string; stored values may be either
/// numbers or numeric strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedVersion {
    #[serde(with = "version_string")]
    pub version: u64,
}

/// One entry of the append-only change log, ordered by `version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRecord {
    #[serde(default)]
    pub id: String,
    pub version: u64,
    /// Change description written by the feed producer.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

fn ensure_non_empty(value: &str, field: &'static str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::missing(field));
    }
    Ok(())
}

fn ensure_year(year: i32) -> Result<(), DomainError> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(DomainError::out_of_range(
            "year",
            format!("{year} is outside {MIN_YEAR}..={MAX_YEAR}"),
        ));
    }
    Ok(())
}

mod version_string {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(value) => Ok(value),
            Raw::Text(text) => text.trim().parse().map_err(D::Error::custom),
        }
    }
}
