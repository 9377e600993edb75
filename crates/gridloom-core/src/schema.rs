//! Schema metadata tree
//!
//! A `SchemaTree` describes the shape of the records behind one grid: field
//! names in display order, each carrying type/label/choice metadata and, for
//! relations, the schema of the related record. The tree is finite and
//! acyclic; collections are homogeneous.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field names that carry row identity, in lookup order.
pub const PK_FIELDS: [&str; 2] = ["pk", "id"];

/// Backend field type vocabulary.
///
/// Unknown backend types degrade to [`FieldType::Other`] instead of failing
/// the whole schema decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Time,
    Choice,
    Email,
    Url,
    Slug,
    FileUpload,
    /// One-to-one nested object relation (wire name `nested object`)
    NestedObject,
    /// One-to-many collection relation (wire name `field`)
    Collection,
    Other(String),
}

impl FieldType {
    /// The backend's name for this type.
    pub fn wire_name(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Time => "time",
            Self::Choice => "choice",
            Self::Email => "email",
            Self::Url => "url",
            Self::Slug => "slug",
            Self::FileUpload => "file upload",
            Self::NestedObject => "nested object",
            Self::Collection => "field",
            Self::Other(name) => name,
        }
    }

    /// Whether values of this type are relation payloads rather than scalars.
    pub fn is_relation(&self) -> bool {
        matches!(self, Self::NestedObject | Self::Collection)
    }
}

impl From<String> for FieldType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "string" => Self::String,
            "integer" => Self::Integer,
            "float" => Self::Float,
            "decimal" => Self::Decimal,
            "boolean" => Self::Boolean,
            "date" => Self::Date,
            "datetime" => Self::DateTime,
            "time" => Self::Time,
            "choice" => Self::Choice,
            "email" => Self::Email,
            "url" => Self::Url,
            "slug" => Self::Slug,
            "file upload" => Self::FileUpload,
            "nested object" => Self::NestedObject,
            "field" => Self::Collection,
            _ => Self::Other(name),
        }
    }
}

impl From<FieldType> for String {
    fn from(field_type: FieldType) -> Self {
        field_type.wire_name().to_string()
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

/// One selectable choice for a choice-typed field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub value: Value,
    pub display_name: String,
}

/// Structural kind of a schema node, resolved once at decode time so
/// downstream code matches exhaustively instead of probing optional fields.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Plain leaf value
    Scalar,
    /// One-to-one nested object
    Nested(SchemaTree),
    /// Homogeneous one-to-many collection
    Collection(SchemaTree),
}

/// Metadata for a single field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMeta {
    pub field_type: FieldType,
    pub label: String,
    pub required: bool,
    pub read_only: bool,
    pub choices: Vec<Choice>,
    pub kind: FieldKind,
}

impl FieldMeta {
    /// Create a scalar leaf field
    pub fn scalar(field_type: FieldType) -> Self {
        Self {
            field_type,
            label: String::new(),
            required: false,
            read_only: false,
            choices: Vec::new(),
            kind: FieldKind::Scalar,
        }
    }

    /// Create a one-to-one nested object field
    pub fn nested(children: SchemaTree) -> Self {
        Self {
            field_type: FieldType::NestedObject,
            label: String::new(),
            required: false,
            read_only: false,
            choices: Vec::new(),
            kind: FieldKind::Nested(children),
        }
    }

    /// Create a one-to-many collection field
    pub fn collection(children: SchemaTree) -> Self {
        Self {
            field_type: FieldType::Collection,
            label: String::new(),
            required: false,
            read_only: false,
            choices: Vec::new(),
            kind: FieldKind::Collection(children),
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn with_choices(mut self, choices: Vec<Choice>) -> Self {
        self.choices = choices;
        self
    }

    /// Child schema for relation nodes, None for scalars
    pub fn children(&self) -> Option<&SchemaTree> {
        match &self.kind {
            FieldKind::Scalar => None,
            FieldKind::Nested(children) | FieldKind::Collection(children) => Some(children),
        }
    }

    /// Whether this field carries a relation payload
    pub fn is_relation(&self) -> bool {
        self.field_type.is_relation() || !matches!(self.kind, FieldKind::Scalar)
    }
}

/// Field-metadata tree describing a record's shape. Insertion order is the
/// backend's display order and is semantically meaningful.
pub type SchemaTree = IndexMap<String, FieldMeta>;

/// Join a dotted path prefix with a field name.
pub fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

/// Dotted paths of every scalar leaf in the tree, in schema order.
pub fn leaf_paths(schema: &SchemaTree) -> Vec<String> {
    let mut paths = Vec::new();
    collect_leaf_paths(schema, "", &mut paths);
    paths
}

fn collect_leaf_paths(schema: &SchemaTree, prefix: &str, out: &mut Vec<String>) {
    for (name, meta) in schema {
        let path = join_path(prefix, name);
        match &meta.kind {
            FieldKind::Scalar => out.push(path),
            FieldKind::Nested(children) | FieldKind::Collection(children) => {
                collect_leaf_paths(children, &path, out);
            }
        }
    }
}

/// Dotted paths of every one-to-many collection node, in schema order.
/// These are the candidate expansion boundaries for flattening.
pub fn collection_paths(schema: &SchemaTree) -> Vec<String> {
    let mut paths = Vec::new();
    collect_collection_paths(schema, "", &mut paths);
    paths
}

fn collect_collection_paths(schema: &SchemaTree, prefix: &str, out: &mut Vec<String>) {
    for (name, meta) in schema {
        let path = join_path(prefix, name);
        match &meta.kind {
            FieldKind::Scalar => {}
            FieldKind::Nested(children) => collect_collection_paths(children, &path, out),
            FieldKind::Collection(children) => {
                out.push(path.clone());
                collect_collection_paths(children, &path, out);
            }
        }
    }
}

/// Candidate primary-key paths at every nesting level of the tree, top level
/// included: `pk`/`id`, `<relation>.pk`/`<relation>.id`, and so on.
pub fn pk_paths(schema: &SchemaTree) -> Vec<String> {
    let mut paths = Vec::new();
    collect_pk_paths(schema, "", &mut paths);
    paths
}

fn collect_pk_paths(schema: &SchemaTree, prefix: &str, out: &mut Vec<String>) {
    for pk in PK_FIELDS {
        out.push(join_path(prefix, pk));
    }
    for (name, meta) in schema {
        if let Some(children) = meta.children() {
            collect_pk_paths(children, &join_path(prefix, name), out);
        }
    }
}
