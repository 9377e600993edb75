//! Filter model and operator translation

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Grid-side filter operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    #[default]
    Equals,
    NotEqual,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    Blank,
    NotBlank,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    InRange,
    Within,
}

impl FilterOperator {
    /// Display label for operator pickers
    pub fn label(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEqual => "not equal",
            Self::Contains => "contains",
            Self::NotContains => "does not contain",
            Self::StartsWith => "starts with",
            Self::EndsWith => "ends with",
            Self::Blank => "is blank",
            Self::NotBlank => "is not blank",
            Self::GreaterThan => "greater than",
            Self::GreaterOrEqual => "greater than or equal",
            Self::LessThan => "less than",
            Self::LessOrEqual => "less than or equal",
            Self::InRange => "in range",
            Self::Within => "within",
        }
    }

    /// Returns true if this operator requires a value input
    pub fn requires_value(&self) -> bool {
        !matches!(self, Self::Blank | Self::NotBlank)
    }

    /// Returns true if this operator requires two values (for ranges)
    pub fn requires_two_values(&self) -> bool {
        matches!(self, Self::InRange)
    }

    /// Get all available operators in display order
    pub fn all() -> &'static [FilterOperator] {
        &[
            Self::Equals,
            Self::NotEqual,
            Self::Contains,
            Self::NotContains,
            Self::StartsWith,
            Self::EndsWith,
            Self::Blank,
            Self::NotBlank,
            Self::GreaterThan,
            Self::GreaterOrEqual,
            Self::LessThan,
            Self::LessOrEqual,
            Self::InRange,
            Self::Within,
        ]
    }
}

/// Wire suffix for a grid operator, None for the canonical equals operator
/// whose wire key is the bare field name.
///
/// Both `Blank` and `NotBlank` encode through `isnull` with a boolean value.
pub fn wire_suffix(operator: FilterOperator) -> Option<&'static str> {
    match operator {
        FilterOperator::Equals => None,
        FilterOperator::NotEqual => Some("iexact_ex"),
        FilterOperator::Contains => Some("icontains"),
        FilterOperator::NotContains => Some("icontains_ex"),
        FilterOperator::StartsWith => Some("istartswith"),
        FilterOperator::EndsWith => Some("iendswith"),
        FilterOperator::Blank | FilterOperator::NotBlank => Some("isnull"),
        FilterOperator::GreaterThan => Some("gt"),
        FilterOperator::GreaterOrEqual => Some("gte"),
        FilterOperator::LessThan => Some("lt"),
        FilterOperator::LessOrEqual => Some("lte"),
        FilterOperator::InRange => Some("range"),
        FilterOperator::Within => Some("in"),
    }
}

/// Grid operator for a wire suffix.
///
/// The mapping is the inverse of [`wire_suffix`] with two documented
/// collapses: `exact`/`iexact` both canonicalise to `Equals` and
/// `startswith`/`istartswith` both to `StartsWith`. Unknown suffixes return
/// None and the clause is dropped.
pub fn grid_operator(wire: &str) -> Option<FilterOperator> {
    match wire {
        "exact" | "iexact" => Some(FilterOperator::Equals),
        "iexact_ex" => Some(FilterOperator::NotEqual),
        "icontains" => Some(FilterOperator::Contains),
        "icontains_ex" => Some(FilterOperator::NotContains),
        "startswith" | "istartswith" => Some(FilterOperator::StartsWith),
        "iendswith" => Some(FilterOperator::EndsWith),
        "isnull" => Some(FilterOperator::Blank),
        "isnull_ex" => Some(FilterOperator::NotBlank),
        "gt" => Some(FilterOperator::GreaterThan),
        "gte" => Some(FilterOperator::GreaterOrEqual),
        "lt" => Some(FilterOperator::LessThan),
        "lte" => Some(FilterOperator::LessOrEqual),
        "range" => Some(FilterOperator::InRange),
        "in" => Some(FilterOperator::Within),
        _ => None,
    }
}

/// A single filter condition against one column
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterClause {
    pub operator: FilterOperator,
    /// Primary value; comma-joined list for `Within`
    pub value: Option<String>,
    /// Secondary value for range operators
    pub value_to: Option<String>,
}

impl FilterClause {
    pub fn new(operator: FilterOperator) -> Self {
        Self {
            operator,
            value: None,
            value_to: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_value_to(mut self, value_to: impl Into<String>) -> Self {
        self.value_to = Some(value_to.into());
        self
    }
}

/// Logical join of clauses inside one column's filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JoinOperator {
    #[default]
    And,
    Or,
}

/// Per-column entry of the grid filter model: either a single clause or a
/// joined group of clauses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterModel {
    Clause(FilterClause),
    Join {
        operator: JoinOperator,
        conditions: Vec<FilterClause>,
    },
}

/// Translate the grid filter model into REST query parameters.
///
/// The wire key is the bare field name for `Equals` and `field__<op>`
/// otherwise; blank operators encode as boolean-valued `isnull` params;
/// range values join with a comma. Clauses missing a required value are
/// dropped. Joined groups flatten to a conjunction; a disjunction is not
/// representable on the wire, so an `Or` group is flattened the same way
/// with a warning.
pub fn to_query_params(model: &IndexMap<String, FilterModel>) -> Vec<(String, String)> {
    let mut params = Vec::new();
    for (field, entry) in model {
        match entry {
            FilterModel::Clause(clause) => {
                if let Some(pair) = translate_clause(field, clause) {
                    params.push(pair);
                }
            }
            FilterModel::Join {
                operator,
                conditions,
            } => {
                if *operator == JoinOperator::Or {
                    tracing::warn!(field = %field, "disjunctive filter group flattened to a conjunction");
                }
                for clause in conditions {
                    if let Some(pair) = translate_clause(field, clause) {
                        params.push(pair);
                    }
                }
            }
        }
    }
    params
}

fn translate_clause(field: &str, clause: &FilterClause) -> Option<(String, String)> {
    let key = |suffix: Option<&str>| match suffix {
        Some(suffix) => format!("{}__{}", field, suffix),
        None => field.to_string(),
    };

    match clause.operator {
        FilterOperator::Blank => Some((key(wire_suffix(clause.operator)), "true".to_string())),
        FilterOperator::NotBlank => Some((key(wire_suffix(clause.operator)), "false".to_string())),
        FilterOperator::InRange => {
            let (Some(from), Some(to)) = (&clause.value, &clause.value_to) else {
                tracing::warn!(field = %field, "range filter without both bounds dropped");
                return None;
            };
            Some((key(wire_suffix(clause.operator)), format!("{},{}", from, to)))
        }
        _ => {
            let Some(value) = &clause.value else {
                tracing::warn!(field = %field, operator = ?clause.operator, "filter clause without value dropped");
                return None;
            };
            Some((key(wire_suffix(clause.operator)), value.clone()))
        }
    }
}

/// Rebuild a simple (one clause per field) filter model from query pairs.
///
/// Used to expose the currently-applied filter back to UI controls; reserved
/// pagination/ordering/search keys and unknown operators are skipped.
pub fn from_query_params(pairs: &[(String, String)]) -> IndexMap<String, FilterClause> {
    const RESERVED: [&str; 4] = ["limit", "offset", "ordering", "search"];

    let mut model = IndexMap::new();
    for (key, value) in pairs {
        if RESERVED.contains(&key.as_str()) {
            continue;
        }
        match key.rsplit_once("__") {
            None => {
                model.insert(
                    key.clone(),
                    FilterClause::new(FilterOperator::Equals).with_value(value.clone()),
                );
            }
            Some((field, suffix)) => {
                let Some(mut operator) = grid_operator(suffix) else {
                    tracing::warn!(key = %key, "unknown wire operator skipped");
                    continue;
                };
                let mut clause = FilterClause::new(operator);
                match operator {
                    FilterOperator::Blank => {
                        if value == "false" {
                            operator = FilterOperator::NotBlank;
                            clause = FilterClause::new(operator);
                        }
                    }
                    FilterOperator::InRange => {
                        if let Some((from, to)) = value.split_once(',') {
                            clause = clause.with_value(from).with_value_to(to);
                        } else {
                            clause = clause.with_value(value.clone());
                        }
                    }
                    _ => clause = clause.with_value(value.clone()),
                }
                model.insert(field.to_string(), clause);
            }
        }
    }
    model
}
