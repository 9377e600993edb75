//! gridloom transformation engines
//!
//! The bidirectional structural mapping between hierarchical records and the
//! flat tabular projection an inline-editable grid needs:
//!
//! - [`flatten`] - tree to table, with Cartesian-product row expansion and
//!   row-span bookkeeping
//! - [`unflatten`] - one flat row back to a hierarchical record fragment
//! - [`merge`] - reconcile an edited fragment with the last-known full
//!   record, matching one-to-many elements by primary key
//! - [`resolve_deletable`] - which nesting levels a row deletion maps to,
//!   determined purely from row-span arithmetic
//!
//! Every function here is synchronous and pure: no I/O, inputs are never
//! mutated.

mod delete;
mod flatten;
mod merge;
mod unflatten;

pub use delete::resolve_deletable;
pub use flatten::flatten;
pub use merge::merge;
pub use unflatten::unflatten;
