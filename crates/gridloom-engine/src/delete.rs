//! Row-span based deletion targeting
//!
//! A displayed row of a denormalized grid may correspond to a leaf-level
//! nested entity, a whole nested collection, or the top-level record itself.
//! Which one is decided purely from row-span arithmetic: a span of 1 at a
//! level's `pk` path means this row is the sole owner of that entity.

use gridloom_core::{join_path, FlatRow, SchemaTree};
use serde_json::Value;

/// Resolve which nesting levels must be deleted remotely when this row is
/// removed from the grid.
///
/// Walks the schema top-down. At each level the synthetic `<prefix>.pk`
/// path (falling back to `<prefix>.id`) is inspected: a span of 1 records
/// the `(path, primary key)` pair and stops descending that branch, since
/// deleting the parent transitively removes its children. Any other span
/// keeps descending into nested and collection children.
pub fn resolve_deletable(row: &FlatRow, schema: &SchemaTree) -> Vec<(String, Value)> {
    let mut targets = Vec::new();
    walk(row, schema, "", &mut targets);
    tracing::debug!(targets = targets.len(), "resolved deletable levels");
    targets
}

fn walk(row: &FlatRow, schema: &SchemaTree, prefix: &str, out: &mut Vec<(String, Value)>) {
    if let Some((path, value)) = row.pk_at(prefix) {
        if row.span(&path) == Some(1) {
            out.push((path, value.clone()));
            return;
        }
    }
    for (name, meta) in schema {
        if let Some(children) = meta.children() {
            walk(row, children, &join_path(prefix, name), out);
        }
    }
}
