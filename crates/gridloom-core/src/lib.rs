//! Core types for gridloom
//!
//! Infrastructure layer shared by every other gridloom crate: the schema
//! metadata tree, hierarchical records, flat row projections, the remote
//! data-source contract, and the common error type. No I/O happens here.

mod error;
mod record;
mod row;
mod schema;
mod source;

pub use error::{GridError, Result};
pub use record::{pk_to_string, record_pk, Record};
pub use row::{FlatRow, RowKey};
pub use schema::{
    collection_paths, join_path, leaf_paths, pk_paths, Choice, FieldKind, FieldMeta, FieldType,
    SchemaTree, PK_FIELDS,
};
pub use source::{ListPage, ListParams, RemoteSource};
