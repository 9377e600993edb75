//! Schema cache for improved performance
//!
//! One schema fetch per table per TTL window. The cache is an explicit
//! object injected into controllers rather than process-wide state, so
//! staleness is testable and invalidation is a real operation.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use gridloom_core::SchemaTree;

struct CachedSchema {
    schema: SchemaTree,
    cached_at: Instant,
}

/// Cache of per-table schema trees with a TTL
pub struct SchemaCache {
    cache: RwLock<HashMap<String, CachedSchema>>,
    ttl: Duration,
}

impl SchemaCache {
    /// Create a new schema cache
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Check if a fresh entry exists for a table
    pub fn is_valid(&self, table: &str) -> bool {
        self.cache
            .read()
            .get(table)
            .is_some_and(|cached| cached.cached_at.elapsed() < self.ttl)
    }

    /// Get the cached schema for a table, if present and fresh
    pub fn get(&self, table: &str) -> Option<SchemaTree> {
        let cache = self.cache.read();
        let result = cache
            .get(table)
            .filter(|cached| cached.cached_at.elapsed() < self.ttl)
            .map(|cached| cached.schema.clone());
        if result.is_some() {
            tracing::debug!(table = %table, "schema cache hit");
        } else {
            tracing::debug!(table = %table, "schema cache miss");
        }
        result
    }

    /// Store a schema for a table
    pub fn set(&self, table: &str, schema: SchemaTree) {
        tracing::debug!(table = %table, fields = schema.len(), "caching schema");
        self.cache.write().insert(
            table.to_string(),
            CachedSchema {
                schema,
                cached_at: Instant::now(),
            },
        );
    }

    /// Invalidate the cached schema for one table
    pub fn invalidate(&self, table: &str) {
        tracing::info!(table = %table, "invalidating schema cache");
        self.cache.write().remove(table);
    }

    /// Clear all cached schemas
    pub fn clear(&self) {
        let count = self.cache.read().len();
        tracing::info!(cache_entries = count, "clearing schema cache");
        self.cache.write().clear();
    }
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(300)) // 5 minute TTL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridloom_core::{FieldMeta, FieldType};

    fn schema() -> SchemaTree {
        let mut schema = SchemaTree::new();
        schema.insert("name".into(), FieldMeta::scalar(FieldType::String));
        schema
    }

    #[test]
    fn entries_are_served_until_invalidated() {
        let cache = SchemaCache::default();
        assert!(cache.get("orders").is_none());

        cache.set("orders", schema());
        assert!(cache.is_valid("orders"));
        assert!(cache.get("orders").is_some());

        cache.invalidate("orders");
        assert!(!cache.is_valid("orders"));
        assert!(cache.get("orders").is_none());
    }

    #[test]
    fn expired_entries_count_as_missing() {
        let cache = SchemaCache::new(Duration::ZERO);
        cache.set("orders", schema());
        assert!(!cache.is_valid("orders"));
        assert!(cache.get("orders").is_none());
    }

    #[test]
    fn clear_drops_every_table() {
        let cache = SchemaCache::default();
        cache.set("orders", schema());
        cache.set("customers", schema());
        cache.clear();
        assert!(cache.get("orders").is_none());
        assert!(cache.get("customers").is_none());
    }
}
