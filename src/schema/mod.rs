//! Schemas for redex namespaces
//!
//! Schemas are explicit capability records: nothing is introspected from
//! stored data. A schema is validated once, when it is registered.
//!
//! # Design Principles
//!
//! - One schema per namespace, owned by an explicit registry
//! - Attribute order is the order mutations are computed in
//! - Every attribute has exactly one keygen in effect

mod errors;
mod keygen;
mod loader;
mod types;
mod validator;

pub use errors::{SchemaError, SchemaResult};
pub use keygen::{CustomKeygen, Keygen, KeygenOutput};
pub use loader::SchemaRegistry;
pub use types::{AttributeSpec, CompositeUnique, Schema};
pub use validator::SchemaValidator;
