//! Table-to-tree reconstruction, the inverse of flattening

use gridloom_core::{join_path, FieldKind, FlatRow, Record, SchemaTree};
use serde_json::Value;

/// Rebuild a hierarchical record fragment from one flat row.
///
/// Recurses over the schema rather than the row, so row paths without a
/// schema node are skipped silently. An all-null nested result collapses to
/// `null` for one-to-one objects and `[]` for one-to-many collections,
/// distinguishing "no related record" from "related record with null
/// fields". One-to-many fields reconstruct a single-element array per call;
/// re-aggregating several rows belonging to the same parent is the caller's
/// concern.
pub fn unflatten(row: &FlatRow, schema: &SchemaTree) -> Record {
    build(row, schema, "").0
}

fn build(row: &FlatRow, schema: &SchemaTree, prefix: &str) -> (Record, bool) {
    let mut record = Record::new();
    let mut any_value = false;

    for (name, meta) in schema {
        let path = join_path(prefix, name);
        match &meta.kind {
            FieldKind::Scalar => {
                // Relation-typed leaves only ever arrive as nested
                // sub-records, never as flat scalar values.
                if meta.field_type.is_relation() {
                    continue;
                }
                if let Some(value) = row.get(&path) {
                    if !value.is_null() {
                        any_value = true;
                    }
                    record.insert(name.clone(), value.clone());
                }
            }
            FieldKind::Nested(children) => {
                let (nested, nested_any) = build(row, children, &path);
                if nested_any {
                    any_value = true;
                    record.insert(name.clone(), Value::Object(nested));
                } else {
                    record.insert(name.clone(), Value::Null);
                }
            }
            FieldKind::Collection(children) => {
                let (nested, nested_any) = build(row, children, &path);
                if nested_any {
                    any_value = true;
                    record.insert(name.clone(), Value::Array(vec![Value::Object(nested)]));
                } else {
                    record.insert(name.clone(), Value::Array(Vec::new()));
                }
            }
        }
    }

    (record, any_value)
}
