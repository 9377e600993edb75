//! Flat row projection of a hierarchical record
//!
//! One `FlatRow` is one grid row of the denormalized tabular projection.
//! Values are keyed by dotted path; row-span bookkeeping lives in a sibling
//! map so the grid can merge-display cells produced by one-to-many expansion.

use indexmap::IndexMap;
use serde_json::Value;
use uuid::Uuid;

use crate::schema::{join_path, PK_FIELDS};

const DRAFT_KEY: &str = "__draft__";

/// Opaque, order-stable grid row identity, distinct from the primary key.
/// Not persisted; a fresh key is minted every time rows are derived.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowKey(String);

impl RowKey {
    /// Mint a new unique key.
    pub fn fresh() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// The sentinel key of an in-progress "add new row" that has not been
    /// persisted yet.
    pub fn draft() -> Self {
        Self(DRAFT_KEY.to_string())
    }

    pub fn is_draft(&self) -> bool {
        self.0 == DRAFT_KEY
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A flat mapping from dotted path to primitive value plus per-path row-span
/// counts.
///
/// Span convention: within a group of rows produced from one one-to-many
/// expansion, exactly one row carries the true span at paths above the
/// branch point and the rest carry 0. A span of 1 at a `pk` path marks the
/// row as sole owner of that nested entity for deletion purposes.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRow {
    key: RowKey,
    values: IndexMap<String, Value>,
    spans: IndexMap<String, u32>,
}

impl FlatRow {
    pub fn new() -> Self {
        Self::with_key(RowKey::fresh())
    }

    pub fn with_key(key: RowKey) -> Self {
        Self {
            key,
            values: IndexMap::new(),
            spans: IndexMap::new(),
        }
    }

    pub fn key(&self) -> &RowKey {
        &self.key
    }

    pub fn is_draft(&self) -> bool {
        self.key.is_draft()
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.values.get(path)
    }

    pub fn set(&mut self, path: impl Into<String>, value: Value) {
        self.values.insert(path.into(), value);
    }

    pub fn remove(&mut self, path: &str) -> Option<Value> {
        self.values.shift_remove(path)
    }

    pub fn span(&self, path: &str) -> Option<u32> {
        self.spans.get(path).copied()
    }

    pub fn set_span(&mut self, path: impl Into<String>, span: u32) {
        self.spans.insert(path.into(), span);
    }

    pub fn remove_span(&mut self, path: &str) -> Option<u32> {
        self.spans.shift_remove(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn values(&self) -> &IndexMap<String, Value> {
        &self.values
    }

    pub fn spans(&self) -> &IndexMap<String, u32> {
        &self.spans
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Primary-key path and value at a nesting level, looked up under
    /// `<prefix>.pk` then `<prefix>.id` (bare `pk`/`id` at the top level).
    pub fn pk_at(&self, prefix: &str) -> Option<(String, &Value)> {
        PK_FIELDS.iter().find_map(|field| {
            let path = join_path(prefix, field);
            self.values
                .get(&path)
                .filter(|v| !v.is_null())
                .map(|v| (path, v))
        })
    }

    /// Top-level primary-key value of the record this row was derived from.
    pub fn pk(&self) -> Option<&Value> {
        self.pk_at("").map(|(_, v)| v)
    }
}

impl Default for FlatRow {
    fn default() -> Self {
        Self::new()
    }
}
