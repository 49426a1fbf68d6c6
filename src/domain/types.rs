//! Shared domain enumerations aligned with stored document values.

use serde::{Deserialize, Serialize};

/// Record collections served by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Institution,
    Cutoff,
}

impl RecordKind {
    /// Segment used in cache keys and log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Institution => "institutions",
            RecordKind::Cutoff => "cutoffs",
        }
    }

    /// Document store collection holding the records.
    pub fn collection(self) -> &'static str {
        match self {
            RecordKind::Institution => "colleges",
            RecordKind::Cutoff => "cutoffs",
        }
    }

    /// Entity name used in error messages.
    pub fn entity(self) -> &'static str {
        match self {
            RecordKind::Institution => "institution",
            RecordKind::Cutoff => "cutoff",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RecordKind::Institution => "Institution",
            RecordKind::Cutoff => "Cutoff",
        }
    }

    /// Id of the metadata document holding the version counter.
    pub fn version_document(self) -> &'static str {
        match self {
            RecordKind::Institution => "colleges_version",
            RecordKind::Cutoff => "cutoffs_version",
        }
    }

    /// Collection holding the append-only update records.
    pub fn updates_collection(self) -> &'static str {
        match self {
            RecordKind::Institution => "colleges_updates",
            RecordKind::Cutoff => "cutoffs_updates",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state carried in a record's nested status metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    Active,
    Inactive,
    Archived,
}

impl RecordState {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordState::Active => "active",
            RecordState::Inactive => "inactive",
            RecordState::Archived => "archived",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}
