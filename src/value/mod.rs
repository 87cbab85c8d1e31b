//! Attribute values
//!
//! Typed values exchanged with the model layer, and the deterministic string
//! encoding used for the primary hash, unique hashes and membership keys.

mod errors;
mod types;

pub use errors::{ValueError, ValueResult};
pub use types::{Value, ValueKind};

use std::collections::BTreeMap;

/// Attribute name → value map describing one state of a record
pub type AttributeMap = BTreeMap<String, Value>;
