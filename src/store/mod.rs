//! Backing store for records and indexes
//!
//! The engine never talks to a transport directly; it is handed a `Store`.
//! `MemoryStore` is the in-process implementation used by tests, the CLI and
//! embedded deployments.

mod errors;
mod memory;
mod traits;
mod zset;

pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use traits::{Batch, Command, Commands, NativeScript, Script, ScriptReply, Store, Watch};
pub use zset::{ScoreKey, ScoreRange, SortedSet};
