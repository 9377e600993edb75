//! Tree-to-table flattening with Cartesian row expansion

use gridloom_core::{join_path, FieldKind, FlatRow, Record, SchemaTree};
use indexmap::IndexMap;
use serde_json::Value;

/// Working row during flattening; converted to a keyed [`FlatRow`] at the end.
#[derive(Debug, Clone, Default)]
struct Partial {
    values: IndexMap<String, Value>,
    spans: IndexMap<String, u32>,
}

impl Partial {
    fn into_flat_row(self) -> FlatRow {
        let mut row = FlatRow::new();
        for (path, value) in self.values {
            row.set(path, value);
        }
        for (path, span) in self.spans {
            row.set_span(path, span);
        }
        row
    }
}

/// Flatten hierarchical records into the denormalized row projection.
///
/// `included_paths` is the grid's ordered column list; it drives both the
/// expansion order (fields are processed in included order, ties in schema
/// order) and the final column drop. `raw_paths` lists the one-to-many
/// collection boundaries to expand; collections not listed keep their array
/// value verbatim at the collection path.
///
/// Row-span bookkeeping: within the rows derived from one record, the first
/// row of the group owning an entity carries that entity's row count at the
/// entity's paths and the remaining rows carry 0. A span of 1 at a `pk` path
/// therefore marks the sole owner of that nested entity.
///
/// A record that is null at a branch point contributes nothing for that
/// branch (optional relations are not an error); an empty expanded
/// collection yields zero rows for the whole record, which the caller must
/// compensate for when a visible empty row is wanted.
pub fn flatten(
    records: &[Record],
    schema: &SchemaTree,
    included_paths: &[String],
    raw_paths: &[String],
) -> Vec<FlatRow> {
    let mut rows = Vec::new();
    for record in records {
        let mut group = flatten_record(record, schema, "", included_paths, raw_paths);
        assign_record_spans(&mut group);
        for mut partial in group {
            finalize(&mut partial, included_paths);
            rows.push(partial.into_flat_row());
        }
    }
    tracing::debug!(records = records.len(), rows = rows.len(), "flattened record set");
    rows
}

fn flatten_record(
    record: &Record,
    schema: &SchemaTree,
    prefix: &str,
    included: &[String],
    raw: &[String],
) -> Vec<Partial> {
    let mut rows = vec![Partial::default()];

    for (name, meta) in ordered_fields(schema, prefix, included) {
        let path = join_path(prefix, name);
        let value = record.get(name.as_str()).filter(|v| !v.is_null());

        match &meta.kind {
            FieldKind::Scalar => {
                if let Some(value) = record.get(name.as_str()) {
                    for row in &mut rows {
                        row.values.insert(path.clone(), value.clone());
                    }
                }
            }
            FieldKind::Nested(children) => {
                // Null or absent nested objects drop the branch silently.
                let Some(Value::Object(nested)) = value else {
                    continue;
                };
                let sub = flatten_record(nested, children, &path, included, raw);
                rows = combine(rows, &[sub]);
            }
            FieldKind::Collection(children) => {
                if !raw.iter().any(|p| p == &path) {
                    // Not an expansion boundary: carry the raw array value.
                    if let Some(value) = value {
                        for row in &mut rows {
                            row.values.insert(path.clone(), value.clone());
                        }
                    }
                    continue;
                }
                let Some(Value::Array(elements)) = value else {
                    continue;
                };
                let groups: Vec<Vec<Partial>> = elements
                    .iter()
                    .filter_map(|element| element.as_object())
                    .map(|element| flatten_record(element, children, &path, included, raw))
                    .collect();
                rows = combine(rows, &groups);
                if rows.is_empty() {
                    // Empty collection: zero rows at this branch point.
                    return rows;
                }
            }
        }
    }

    rows
}

/// Process fields in the order of the grid's column list so span assignment
/// is deterministic; fields without an included column keep schema order at
/// the back (stable sort).
fn ordered_fields<'a>(
    schema: &'a SchemaTree,
    prefix: &str,
    included: &[String],
) -> Vec<(&'a String, &'a gridloom_core::FieldMeta)> {
    let mut fields: Vec<_> = schema.iter().collect();
    fields.sort_by_key(|(name, _)| {
        let path = join_path(prefix, name);
        let nested_prefix = format!("{}.", path);
        included
            .iter()
            .position(|p| p == &path || p.starts_with(&nested_prefix))
            .unwrap_or(usize::MAX)
    });
    fields
}

/// Cartesian combination of the accumulated rows with one expansion: one
/// group of sub-rows per collection element (a nested object is a single
/// degenerate group).
///
/// Span rules, per base row:
/// - paths already on the base row scale by the expansion size on the first
///   combined row and zero out on the rest (a missing span counts as 1);
/// - paths introduced by a sub-row keep any deeper-assigned span, otherwise
///   the first row of each element's sub-group carries that element's row
///   count and the rest carry 0.
fn combine(rows: Vec<Partial>, groups: &[Vec<Partial>]) -> Vec<Partial> {
    let total: usize = groups.iter().map(Vec::len).sum();
    if total == 0 {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(rows.len() * total);
    for base in rows {
        let mut index = 0usize;
        for group in groups {
            for (element_row, sub) in group.iter().enumerate() {
                let mut row = base.clone();

                for path in base.values.keys() {
                    let span = base.spans.get(path).copied().unwrap_or(1);
                    let scaled = if index == 0 { span * total as u32 } else { 0 };
                    row.spans.insert(path.clone(), scaled);
                }

                for (path, value) in &sub.values {
                    row.values.insert(path.clone(), value.clone());
                }
                for (path, _) in &sub.values {
                    let span = match sub.spans.get(path) {
                        Some(span) => *span,
                        None if element_row == 0 => group.len() as u32,
                        None => 0,
                    };
                    row.spans.insert(path.clone(), span);
                }

                out.push(row);
                index += 1;
            }
        }
    }
    out
}

/// Record-level paths that never went through a combine (a record with no
/// expanded collection on that path) still need spans so the grid can merge
/// cells and the delete resolver can see ownership: the first row of the
/// record's group carries the group size, the rest carry 0.
fn assign_record_spans(group: &mut [Partial]) {
    let size = group.len() as u32;
    for (index, row) in group.iter_mut().enumerate() {
        let missing: Vec<String> = row
            .values
            .keys()
            .filter(|path| !row.spans.contains_key(*path))
            .cloned()
            .collect();
        for path in missing {
            row.spans.insert(path, if index == 0 { size } else { 0 });
        }
    }
}

/// Post-processing: propagate spans from a matched ancestor path onto
/// included columns that have no value in this row, then drop everything the
/// grid did not ask for.
fn finalize(partial: &mut Partial, included: &[String]) {
    for path in included {
        if partial.values.contains_key(path) || partial.spans.contains_key(path) {
            continue;
        }
        let mut prefix = parent_path(path);
        loop {
            let matched = partial
                .spans
                .iter()
                .find(|(candidate, _)| parent_path(candidate) == prefix)
                .map(|(_, span)| *span);
            if let Some(span) = matched {
                partial.spans.insert(path.clone(), span);
                break;
            }
            if prefix.is_empty() {
                break;
            }
            prefix = parent_path(prefix);
        }
    }

    partial
        .values
        .retain(|path, _| included.iter().any(|p| p == path));
    partial
        .spans
        .retain(|path, _| included.iter().any(|p| p == path));
}

fn parent_path(path: &str) -> &str {
    match path.rfind('.') {
        Some(split) => &path[..split],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridloom_core::{FieldMeta, FieldType};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn to_record(value: serde_json::Value) -> Record {
        value.as_object().expect("object fixture").clone()
    }

    fn item_schema() -> SchemaTree {
        let mut items = SchemaTree::new();
        items.insert("pk".into(), FieldMeta::scalar(FieldType::Integer));
        items.insert("sku".into(), FieldMeta::scalar(FieldType::String));
        items.insert("qty".into(), FieldMeta::scalar(FieldType::Integer));
        items
    }

    fn order_schema() -> SchemaTree {
        let mut schema = SchemaTree::new();
        schema.insert("pk".into(), FieldMeta::scalar(FieldType::Integer));
        schema.insert("name".into(), FieldMeta::scalar(FieldType::String));
        schema.insert("order_items".into(), FieldMeta::collection(item_schema()));
        schema
    }

    fn paths(strings: &[&str]) -> Vec<String> {
        strings.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn one_to_many_expansion_produces_one_row_per_element() {
        let record = to_record(json!({
            "order_items": [
                {"sku": "A", "qty": 1},
                {"sku": "B", "qty": 2},
            ]
        }));
        let rows = flatten(
            &[record],
            &order_schema(),
            &paths(&["order_items.sku", "order_items.qty"]),
            &paths(&["order_items"]),
        );

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("order_items.sku"), Some(&json!("A")));
        assert_eq!(rows[0].get("order_items.qty"), Some(&json!(1)));
        assert_eq!(rows[0].span("order_items.sku"), Some(1));
        assert_eq!(rows[1].get("order_items.sku"), Some(&json!("B")));
        assert_eq!(rows[1].get("order_items.qty"), Some(&json!(2)));
    }

    #[test]
    fn ancestor_columns_span_the_whole_group() {
        let record = to_record(json!({
            "pk": 7,
            "name": "order-7",
            "order_items": [
                {"pk": 1, "sku": "A"},
                {"pk": 2, "sku": "B"},
                {"pk": 3, "sku": "C"},
            ]
        }));
        let rows = flatten(
            &[record],
            &order_schema(),
            &paths(&["pk", "name", "order_items.pk", "order_items.sku"]),
            &paths(&["order_items"]),
        );

        assert_eq!(rows.len(), 3);
        // exactly one row carries the group size at the ancestor paths
        assert_eq!(rows[0].span("pk"), Some(3));
        assert_eq!(rows[0].span("name"), Some(3));
        assert_eq!(rows[1].span("pk"), Some(0));
        assert_eq!(rows[2].span("name"), Some(0));
        // every item row solely owns its element
        for row in &rows {
            assert_eq!(row.span("order_items.pk"), Some(1));
        }
    }

    #[test]
    fn sibling_collections_multiply_cartesian() {
        let mut schema = SchemaTree::new();
        schema.insert("pk".into(), FieldMeta::scalar(FieldType::Integer));
        schema.insert("tags".into(), FieldMeta::collection({
            let mut t = SchemaTree::new();
            t.insert("label".into(), FieldMeta::scalar(FieldType::String));
            t
        }));
        schema.insert("order_items".into(), FieldMeta::collection(item_schema()));

        let record = to_record(json!({
            "pk": 1,
            "tags": [{"label": "x"}, {"label": "y"}],
            "order_items": [
                {"sku": "A"}, {"sku": "B"}, {"sku": "C"},
            ]
        }));
        let rows = flatten(
            &[record],
            &schema,
            &paths(&["pk", "tags.label", "order_items.sku"]),
            &paths(&["tags", "order_items"]),
        );

        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].span("pk"), Some(6));
        assert!(rows[1..].iter().all(|r| r.span("pk") == Some(0)));
    }

    #[test]
    fn nesting_collections_multiplies_rather_than_adds() {
        let mut units = SchemaTree::new();
        units.insert("serial".into(), FieldMeta::scalar(FieldType::String));
        let mut items = SchemaTree::new();
        items.insert("sku".into(), FieldMeta::scalar(FieldType::String));
        items.insert("units".into(), FieldMeta::collection(units));
        let mut schema = SchemaTree::new();
        schema.insert("pk".into(), FieldMeta::scalar(FieldType::Integer));
        schema.insert("items".into(), FieldMeta::collection(items));

        let record = to_record(json!({
            "pk": 9,
            "items": [
                {"sku": "A", "units": [{"serial": "a1"}, {"serial": "a2"}]},
                {"sku": "B", "units": [{"serial": "b1"}]},
            ]
        }));
        let rows = flatten(
            &[record],
            &schema,
            &paths(&["pk", "items.sku", "items.units.serial"]),
            &paths(&["items", "items.units"]),
        );

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].span("pk"), Some(3));
        // item A spans its two unit rows, item B spans one
        assert_eq!(rows[0].span("items.sku"), Some(2));
        assert_eq!(rows[1].span("items.sku"), Some(0));
        assert_eq!(rows[2].span("items.sku"), Some(1));
        assert_eq!(rows[0].get("items.units.serial"), Some(&json!("a1")));
        assert_eq!(rows[2].get("items.units.serial"), Some(&json!("b1")));
    }

    #[test]
    fn nested_object_does_not_multiply_rows() {
        let mut customer = SchemaTree::new();
        customer.insert("name".into(), FieldMeta::scalar(FieldType::String));
        let mut schema = SchemaTree::new();
        schema.insert("pk".into(), FieldMeta::scalar(FieldType::Integer));
        schema.insert("customer".into(), FieldMeta::nested(customer));

        let record = to_record(json!({"pk": 1, "customer": {"name": "Ada"}}));
        let rows = flatten(
            &[record],
            &schema,
            &paths(&["pk", "customer.name"]),
            &[],
        );

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("customer.name"), Some(&json!("Ada")));
        assert_eq!(rows[0].span("pk"), Some(1));
    }

    #[test]
    fn null_branch_short_circuits_silently() {
        let mut customer = SchemaTree::new();
        customer.insert("name".into(), FieldMeta::scalar(FieldType::String));
        let mut schema = SchemaTree::new();
        schema.insert("pk".into(), FieldMeta::scalar(FieldType::Integer));
        schema.insert("customer".into(), FieldMeta::nested(customer));

        let record = to_record(json!({"pk": 1, "customer": null}));
        let rows = flatten(
            &[record],
            &schema,
            &paths(&["pk", "customer.name"]),
            &[],
        );

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("customer.name"), None);
        assert_eq!(rows[0].get("pk"), Some(&json!(1)));
    }

    #[test]
    fn empty_collection_yields_zero_rows() {
        let record = to_record(json!({"pk": 3, "order_items": []}));
        let rows = flatten(
            &[record],
            &order_schema(),
            &paths(&["pk", "order_items.sku"]),
            &paths(&["order_items"]),
        );
        assert!(rows.is_empty());
    }

    #[test]
    fn columns_outside_included_paths_are_dropped() {
        let record = to_record(json!({"pk": 3, "name": "hidden", "order_items": [{"sku": "A"}]}));
        let rows = flatten(
            &[record],
            &order_schema(),
            &paths(&["pk", "order_items.sku"]),
            &paths(&["order_items"]),
        );

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name"), None);
        assert_eq!(rows[0].span("name"), None);
        assert_eq!(rows[0].get("pk"), Some(&json!(3)));
    }

    #[test]
    fn unexpanded_collection_keeps_raw_array_value() {
        let record = to_record(json!({"pk": 3, "order_items": [{"sku": "A"}]}));
        let rows = flatten(
            &[record],
            &order_schema(),
            &paths(&["pk", "order_items"]),
            &[],
        );

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("order_items"), Some(&json!([{"sku": "A"}])));
    }

    #[test]
    fn spans_propagate_onto_valueless_columns() {
        let record = to_record(json!({
            "pk": 7,
            "order_items": [
                {"pk": 1, "sku": "A", "qty": 1},
                {"pk": 2, "sku": "B"},
            ]
        }));
        let rows = flatten(
            &[record],
            &order_schema(),
            &paths(&["pk", "order_items.sku", "order_items.qty"]),
            &paths(&["order_items"]),
        );

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("order_items.qty"), None);
        // the missing qty cell inherits the span of its sibling element paths
        assert_eq!(rows[1].span("order_items.qty"), Some(1));
    }

    #[test]
    fn multiple_records_flatten_into_independent_groups() {
        let records = vec![
            to_record(json!({"pk": 1, "order_items": [{"sku": "A"}, {"sku": "B"}]})),
            to_record(json!({"pk": 2, "order_items": [{"sku": "C"}]})),
        ];
        let rows = flatten(
            &records,
            &order_schema(),
            &paths(&["pk", "order_items.sku"]),
            &paths(&["order_items"]),
        );

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].span("pk"), Some(2));
        assert_eq!(rows[1].span("pk"), Some(0));
        assert_eq!(rows[2].span("pk"), Some(1));
        assert_eq!(rows[2].get("pk"), Some(&json!(2)));
    }
}
