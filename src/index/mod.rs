//! Secondary indexes for redex
//!
//! Indexes are derived state stored next to the records they describe. Each
//! record carries a descriptor listing its live index entries, so entries can
//! be removed without recomputing them from attribute values.
//!
//! # Invariants
//!
//! - Index mutations are queued into the same atomic unit as the record write
//! - After every successful commit the descriptor mirrors the live entries
//! - Text scans verify candidates against the stored text

mod codec;
mod descriptor;
mod entries;
mod errors;
mod keys;
mod pattern;
mod registry;

pub use codec::{PrefixCodec, SCORE_BYTES};
pub use descriptor::IndexDescriptor;
pub use entries::IndexEntries;
pub use errors::{IndexError, IndexResult};
pub use keys::{
    membership_entry, pack_member, scored_entry, unpack_member, KeyLayout, MEMBER_SEPARATOR,
};
pub use pattern::LikePattern;
pub use registry::IndexRegistry;
