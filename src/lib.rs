//! redex - secondary indexes and atomic record writes over a key-value store
//!
//! Records live in hashes; every indexed attribute feeds membership sets,
//! range sorted sets, prefix/suffix sorted sets or unique hashes, and a
//! per-record descriptor remembers which entries a record owns. Writes replace
//! a record's entries atomically, either through one server-side script or
//! through an optimistic watch/exec transaction. Queries compile to plans over
//! those indexes.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod index;
pub mod observability;
pub mod planner;
pub mod schema;
pub mod store;
pub mod value;
pub mod writer;

pub use config::{CommitStrategy, EngineConfig};
pub use engine::Engine;
pub use error::{Error, Result};
pub use executor::EntityCache;
pub use index::IndexDescriptor;
pub use planner::{ExplainPlan, Query};
pub use schema::{AttributeSpec, Keygen, Schema};
pub use store::{MemoryStore, Store};
pub use value::{AttributeMap, Value, ValueKind};
pub use writer::Change;
