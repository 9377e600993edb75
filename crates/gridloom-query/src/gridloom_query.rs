//! Filter and sort vocabulary translation
//!
//! Bidirectional mapping between the grid's structured filter/sort model and
//! REST query-string conventions: `field` / `field__<op>` keys on the wire,
//! a closed operator vocabulary on the grid side. The forward direction
//! builds list-query parameters; the reverse direction exists so applied
//! filters can be shown back in UI controls, not for parsing arbitrary
//! query strings.

mod filter;
mod sort;

pub use filter::{
    from_query_params, grid_operator, to_query_params, wire_suffix, FilterClause, FilterModel,
    FilterOperator, JoinOperator,
};
pub use sort::{from_sort_param, to_sort_param, SortClause, SortDirection, ORDERING_KEY};
