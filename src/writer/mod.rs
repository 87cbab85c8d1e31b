//! Atomic writes for redex
//!
//! A record change is applied together with its unique mappings, index
//! entries and index descriptor as one atomic unit, either through a
//! server-side script or through an optimistic WATCH + MULTI/EXEC loop.
//!
//! # Invariants
//!
//! - All unique constraints are checked before anything is written
//! - A stale unique mapping is removed only while it still names the record
//! - The descriptor written last names exactly the live index entries
//! - A failed write leaves the store untouched

mod errors;
mod mutation;
mod optimistic;
mod script;
mod unique;
#[allow(clippy::module_inception)]
mod writer;

pub use errors::{WriteError, WriteResult};
pub use mutation::{Change, MutationSet};
pub use script::{ScriptArgs, WRITER_LUA, WRITER_SCRIPT};
pub use unique::{Conflict, EncodedMap, UniqueChanges, UniqueConstraintEnforcer};
pub use writer::AtomicWriter;
