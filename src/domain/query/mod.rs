//! Typed query arguments and their untyped lowering.

pub mod aggregate;
pub mod args;
pub mod eval;
pub mod filter;
pub mod projection;

pub use aggregate::{AggregateArgs, AggregateResult, AggregateSelection, Aggregates, Group, GroupByArgs};
pub use args::{FindManyArgs, NullsOrder, OrderBy, OrderKey, SortOrder};
pub use filter::{check_value, CompareOp, Filter, Predicate, Quantifier};
pub use projection::{row_to_json, Include, Projection};
