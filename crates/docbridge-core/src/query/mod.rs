//! Module: query
//! Responsibility: REST where clauses → native queries, including the
//! per-field constraint operators.
//! Does not own: executing queries or resolving `$select`/`$dontSelect`
//! subqueries, which need storage access.

mod constraint;
mod order;
mod where_clause;


pub use constraint::transform_constraint;
pub use order::{ConstraintOp, PROCESSING_ORDER};

pub(crate) use where_clause::QueryCompiler;
