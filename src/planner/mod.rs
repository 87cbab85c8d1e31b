//! Query planning for redex
//!
//! Compiles declarative filters into store-level steps.
//!
//! # Design Principles
//!
//! - Deterministic: same schema and query, same plan
//! - Explicit: filters only run against indexes the schema declares
//! - Early: malformed queries are rejected before any store access
//!
//! # Combination
//!
//! Filters are intersected left to right. The first range filter supplies
//! the default order; `order_by` re-sorts by an attribute's range index.

mod ast;
mod errors;
mod explain;
#[allow(clippy::module_inception)]
mod planner;

pub use ast::{Filter, FilterPredicate, Ordering, Query};
pub use errors::{QueryError, QueryResult};
pub use explain::{ExplainPlan, ExplainStep};
pub use planner::{OrderStep, PlanStep, QueryPlan, QueryPlanner};
