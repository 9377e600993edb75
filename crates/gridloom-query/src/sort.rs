//! Sort model and ordering translation

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Wire key for the sort parameter
pub const ORDERING_KEY: &str = "ordering";

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggle(&self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

/// A single sort criterion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortClause {
    pub field: String,
    pub direction: SortDirection,
}

impl SortClause {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// Translate the sort model into the `ordering` query parameter: a
/// comma-joined field list with a leading `-` for descending. Returns None
/// when no sort is active.
pub fn to_sort_param(sorts: &[SortClause]) -> Option<(String, String)> {
    if sorts.is_empty() {
        return None;
    }
    let value = sorts
        .iter()
        .map(|sort| match sort.direction {
            SortDirection::Ascending => sort.field.clone(),
            SortDirection::Descending => format!("-{}", sort.field),
        })
        .join(",");
    Some((ORDERING_KEY.to_string(), value))
}

/// Parse an `ordering` value back into the sort model, for UI display.
pub fn from_sort_param(value: &str) -> Vec<SortClause> {
    value
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| match part.strip_prefix('-') {
            Some(field) => SortClause::descending(field),
            None => SortClause::ascending(part),
        })
        .collect()
}
