//! OPTIONS metadata decoding
//!
//! The backend's OPTIONS response carries field metadata under
//! `actions.POST`: a mapping from field name to `{type, label, required,
//! read_only, choices?, children?, child?}` where `children` denotes a
//! one-to-one nested object and `child.children` a one-to-many collection.
//! Decoding resolves that duck typing into the [`FieldKind`] tagged union
//! once, so nothing downstream probes optional fields.

use gridloom_core::{Choice, FieldKind, FieldMeta, FieldType, GridError, Result, SchemaTree};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct RawFieldMeta {
    #[serde(rename = "type", default)]
    field_type: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    read_only: bool,
    #[serde(default)]
    choices: Vec<RawChoice>,
    #[serde(default)]
    children: Option<IndexMap<String, RawFieldMeta>>,
    #[serde(default)]
    child: Option<Box<RawChild>>,
}

#[derive(Debug, Deserialize)]
struct RawChild {
    #[serde(default)]
    children: Option<IndexMap<String, RawFieldMeta>>,
}

#[derive(Debug, Deserialize)]
struct RawChoice {
    value: Value,
    display_name: String,
}

/// Decode a full OPTIONS response body into a schema tree.
pub fn decode_options(body: &Value) -> Result<SchemaTree> {
    let metadata = body
        .pointer("/actions/POST")
        .ok_or_else(|| GridError::Schema("OPTIONS response has no actions.POST metadata".to_string()))?;
    decode_schema(metadata)
}

/// Decode the field-metadata mapping itself (the value of `actions.POST`).
pub fn decode_schema(metadata: &Value) -> Result<SchemaTree> {
    let raw: IndexMap<String, RawFieldMeta> = serde_json::from_value(metadata.clone())?;
    convert_tree(raw)
}

fn convert_tree(raw: IndexMap<String, RawFieldMeta>) -> Result<SchemaTree> {
    let mut tree = SchemaTree::new();
    for (name, field) in raw {
        let converted = convert_field(field)
            .map_err(|e| GridError::Schema(format!("field '{}': {}", name, e)))?;
        tree.insert(name, converted);
    }
    Ok(tree)
}

fn convert_field(raw: RawFieldMeta) -> Result<FieldMeta> {
    let kind = match (raw.children, raw.child) {
        (Some(_), Some(_)) => {
            return Err(GridError::Schema(
                "declares both a nested object and a collection".to_string(),
            ));
        }
        (Some(children), None) => FieldKind::Nested(convert_tree(children)?),
        (None, Some(child)) => {
            FieldKind::Collection(convert_tree(child.children.unwrap_or_default())?)
        }
        (None, None) => FieldKind::Scalar,
    };

    let field_type = match raw.field_type {
        Some(name) => FieldType::from(name),
        None => match &kind {
            FieldKind::Nested(_) => FieldType::NestedObject,
            FieldKind::Collection(_) => FieldType::Collection,
            FieldKind::Scalar => FieldType::String,
        },
    };

    Ok(FieldMeta {
        field_type,
        label: raw.label.unwrap_or_default(),
        required: raw.required,
        read_only: raw.read_only,
        choices: raw
            .choices
            .into_iter()
            .map(|choice| Choice {
                value: choice.value,
                display_name: choice.display_name,
            })
            .collect(),
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn scalar_fields_decode_type_and_flags() {
        let schema = decode_schema(&json!({
            "name": {"type": "string", "label": "Name", "required": true},
            "qty": {"type": "integer", "read_only": true},
        }))
        .unwrap();

        let name = &schema["name"];
        assert_eq!(name.field_type, FieldType::String);
        assert_eq!(name.label, "Name");
        assert!(name.required);
        assert_eq!(name.kind, FieldKind::Scalar);
        assert!(schema["qty"].read_only);
    }

    #[test]
    fn children_decode_to_a_nested_object() {
        let schema = decode_schema(&json!({
            "customer": {
                "type": "nested object",
                "children": {"city": {"type": "string"}},
            }
        }))
        .unwrap();

        match &schema["customer"].kind {
            FieldKind::Nested(children) => {
                assert_eq!(children["city"].field_type, FieldType::String);
            }
            other => panic!("expected nested object, got {:?}", other),
        }
    }

    #[test]
    fn child_children_decode_to_a_collection() {
        let schema = decode_schema(&json!({
            "order_items": {
                "type": "field",
                "child": {"children": {"sku": {"type": "string"}}},
            }
        }))
        .unwrap();

        match &schema["order_items"].kind {
            FieldKind::Collection(children) => {
                assert_eq!(children["sku"].field_type, FieldType::String);
            }
            other => panic!("expected collection, got {:?}", other),
        }
        assert_eq!(schema["order_items"].field_type, FieldType::Collection);
    }

    #[test]
    fn both_children_and_child_is_a_decode_error() {
        let result = decode_schema(&json!({
            "broken": {
                "children": {"a": {"type": "string"}},
                "child": {"children": {"b": {"type": "string"}}},
            }
        }));
        assert!(matches!(result, Err(GridError::Schema(_))));
    }

    #[test]
    fn choices_survive_the_decode() {
        let schema = decode_schema(&json!({
            "status": {
                "type": "choice",
                "choices": [
                    {"value": "open", "display_name": "Open"},
                    {"value": "done", "display_name": "Done"},
                ],
            }
        }))
        .unwrap();

        let status = &schema["status"];
        assert_eq!(status.choices.len(), 2);
        assert_eq!(status.choices[0].display_name, "Open");
    }

    #[test]
    fn options_envelope_navigates_to_post_metadata() {
        let schema = decode_options(&json!({
            "name": "Orders",
            "actions": {"POST": {"name": {"type": "string"}}},
        }))
        .unwrap();
        assert!(schema.contains_key("name"));

        let missing = decode_options(&json!({"name": "Orders"}));
        assert!(matches!(missing, Err(GridError::Schema(_))));
    }
}
