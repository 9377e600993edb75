//! Hierarchical records

use serde_json::Value;

use crate::schema::PK_FIELDS;

/// A hierarchical record conforming to a [`SchemaTree`](crate::SchemaTree):
/// primitive leaves at scalar fields, a nested record at one-to-one fields,
/// an array of nested records at one-to-many fields.
pub type Record = serde_json::Map<String, Value>;

/// Primary-key value of a record, looked up under `pk` then `id`.
pub fn record_pk(record: &Record) -> Option<&Value> {
    PK_FIELDS
        .iter()
        .find_map(|field| record.get(*field))
        .filter(|v| !v.is_null())
}

/// Render a primary-key value as a URL path segment.
///
/// Strings pass through unquoted; numbers format naturally. Anything else
/// (objects, arrays, booleans) is not a usable identifier.
pub fn pk_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_pk_prefers_pk_over_id() {
        let record: Record = json!({"pk": 7, "id": 9}).as_object().unwrap().clone();
        assert_eq!(record_pk(&record), Some(&json!(7)));
    }

    #[test]
    fn record_pk_falls_back_to_id() {
        let record: Record = json!({"id": 9}).as_object().unwrap().clone();
        assert_eq!(record_pk(&record), Some(&json!(9)));
    }

    #[test]
    fn null_pk_counts_as_absent() {
        let record: Record = json!({"pk": null}).as_object().unwrap().clone();
        assert_eq!(record_pk(&record), None);
    }

    #[test]
    fn pk_to_string_handles_strings_and_numbers() {
        assert_eq!(pk_to_string(&json!("abc")), Some("abc".to_string()));
        assert_eq!(pk_to_string(&json!(42)), Some("42".to_string()));
        assert_eq!(pk_to_string(&json!({"nested": true})), None);
    }
}
