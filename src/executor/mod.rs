//! Query execution for redex
//!
//! Runs plans against the store and produces ordered id lists, counts,
//! cached results and paged iteration over them.
//!
//! # Invariants
//!
//! - Deterministic: same plan and same data, same ids in the same order
//! - Intermediate results are intersected left to right and an empty one
//!   stops execution
//! - Cached results are written in one batch and always carry an expiry

#[allow(clippy::module_inception)]
mod executor;
mod pager;
mod result;

pub use executor::QueryExecutor;
pub use pager::{EntityCache, EntityPages, Pages};
pub use result::{window, Candidates, ExecutionResult};
