//! Remote data-source contract

use async_trait::async_trait;

use crate::{Record, Result, SchemaTree};

/// Query parameters for a list call: pagination plus whatever the filter and
/// sort translators produced.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub limit: Option<usize>,
    pub offset: usize,
    /// Already-translated query pairs (filters, ordering, search).
    pub query: Vec<(String, String)>,
}

impl ListParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.query.push((key.into(), value.into()));
    }

    /// All query pairs including pagination, ready for URL encoding.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.query.len() + 2);
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if self.offset > 0 {
            pairs.push(("offset".to_string(), self.offset.to_string()));
        }
        pairs.extend(self.query.iter().cloned());
        pairs
    }
}

/// One page of a paginated list response
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub results: Vec<Record>,
    /// Total matching records across all pages.
    pub count: u64,
}

/// A remote CRUD data source for one backend.
///
/// The table name addresses a resource collection; record identity uses the
/// backend-assigned primary key rendered as a path segment. Implementations
/// must not retry failed calls themselves; retry policy belongs to the
/// caller.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetch one page of records.
    async fn list(&self, table: &str, params: &ListParams) -> Result<ListPage>;

    /// Create a record, returning the stored form (with server-assigned keys).
    async fn create(&self, table: &str, body: &Record) -> Result<Record>;

    /// Partially update the record identified by `id`.
    async fn update(&self, table: &str, id: &str, body: &Record) -> Result<Record>;

    /// Delete the record identified by `id`.
    async fn delete(&self, table: &str, id: &str) -> Result<()>;

    /// Fetch the field-metadata tree describing the table's record shape.
    async fn options(&self, table: &str) -> Result<SchemaTree>;
}
