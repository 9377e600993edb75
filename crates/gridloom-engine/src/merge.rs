//! Conflict-aware reconciliation of an edited fragment with a full record

use gridloom_core::{record_pk, FieldKind, Record, SchemaTree};
use serde_json::Value;

/// Reconcile a freshly-edited partial record `b` against the last-known
/// authoritative record `a`.
///
/// Per schema field: nested objects recurse; one-to-many elements merge by
/// primary key, where elements of `b` with no match are kept as new entities
/// and elements of `a` whose key is absent from the result are appended
/// unchanged; plain scalars prefer `a` when present (the caller folds form
/// edits into `b` before merging); relation-typed fields prefer `b`, since
/// nested editors rebuild relation payloads wholesale.
///
/// An element of `b` without a primary key is always treated as a new
/// entity, so a client-side reorder that drops keys will duplicate rather
/// than update.
///
/// Keys outside the schema (server bookkeeping, identity fields) carry
/// through, preferring `a`. Inputs are never mutated.
pub fn merge(a: &Record, b: &Record, schema: &SchemaTree) -> Record {
    let mut out = Record::new();

    for (name, meta) in schema {
        let from_a = a.get(name.as_str());
        let from_b = b.get(name.as_str());

        let merged = match &meta.kind {
            FieldKind::Nested(children) => match (from_a, from_b) {
                (Some(Value::Object(ao)), Some(Value::Object(bo))) => {
                    Some(Value::Object(merge(ao, bo, children)))
                }
                _ => from_b.or(from_a).cloned(),
            },
            FieldKind::Collection(children) => match (from_a, from_b) {
                (Some(Value::Array(ae)), Some(Value::Array(be))) => {
                    Some(Value::Array(merge_elements(ae, be, children)))
                }
                _ => from_b.or(from_a).cloned(),
            },
            FieldKind::Scalar => {
                if meta.field_type.is_relation() {
                    from_b.or(from_a).cloned()
                } else {
                    from_a.or(from_b).cloned()
                }
            }
        };

        if let Some(value) = merged {
            out.insert(name.clone(), value);
        }
    }

    for (key, value) in a {
        if !schema.contains_key(key) && !out.contains_key(key) {
            out.insert(key.clone(), value.clone());
        }
    }
    for (key, value) in b {
        if !schema.contains_key(key) && !out.contains_key(key) {
            out.insert(key.clone(), value.clone());
        }
    }

    out
}

fn merge_elements(a_elements: &[Value], b_elements: &[Value], schema: &SchemaTree) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(a_elements.len().max(b_elements.len()));

    for element in b_elements {
        let Some(edited) = element.as_object() else {
            out.push(element.clone());
            continue;
        };
        let matched = record_pk(edited).and_then(|pk| {
            a_elements
                .iter()
                .filter_map(Value::as_object)
                .find(|known| record_pk(known) == Some(pk))
        });
        match matched {
            Some(known) => out.push(Value::Object(merge(known, edited, schema))),
            // no primary-key match: a new entity, never an error
            None => out.push(element.clone()),
        }
    }

    // preserve untouched siblings the edited fragment did not carry
    for element in a_elements {
        let Some(known) = element.as_object() else {
            continue;
        };
        let Some(pk) = record_pk(known) else {
            continue;
        };
        let already_present = out
            .iter()
            .filter_map(Value::as_object)
            .any(|merged| record_pk(merged) == Some(pk));
        if !already_present {
            out.push(element.clone());
        }
    }

    out
}
