//! Unique constraint enforcement
//!
//! Single-column constraints map an encoded value to the owning id in
//! `<ns>:<attr>:uidx`. Composite constraints map the JSON array of the
//! participating encoded values to the id in `<ns>:<c1>:<c2>...:uidx`.
//!
//! Planning is pure; checking and stale-mapping removal take a lookup
//! function so the same rules run inside a script and on the optimistic path.

use std::collections::BTreeMap;

use crate::schema::Schema;
use crate::store::StoreResult;

/// Encoded attribute values, attribute -> store string
pub type EncodedMap = BTreeMap<String, String>;

/// Unique mappings to add and remove for one record change
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniqueChanges {
    /// constraint name -> new value; checked, then written
    pub insert: BTreeMap<String, String>,
    /// constraint name -> old value; removed if still owned by the record
    pub remove: BTreeMap<String, String>,
}

impl UniqueChanges {
    pub fn is_empty(&self) -> bool {
        self.insert.is_empty() && self.remove.is_empty()
    }

    /// Every constraint touched, in name order
    pub fn constraints(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .insert
            .keys()
            .chain(self.remove.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

/// A mapping owned by another record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub constraint: String,
    pub value: String,
}

/// Plans and checks unique mappings for a namespace
#[derive(Debug, Clone, Copy)]
pub struct UniqueConstraintEnforcer<'a> {
    schema: &'a Schema,
}

impl<'a> UniqueConstraintEnforcer<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Computes the unique mappings implied by `old -> new`.
    ///
    /// Single columns: a changed (or `full`) present value is inserted and
    /// the previous value is removed; a removed value only drops its mapping.
    /// Composites: skipped when any new value is absent; the old tuple is
    /// removed when it changed and was complete.
    pub fn plan(&self, old: &EncodedMap, new: &EncodedMap, full: bool) -> UniqueChanges {
        let mut changes = UniqueChanges::default();

        for attr in self.schema.unique_columns() {
            let before = old.get(&attr.name);
            let after = new.get(&attr.name);
            if before == after && !full {
                continue;
            }
            match (before, after) {
                (Some(before), None) => {
                    changes.remove.insert(attr.name.clone(), before.clone());
                }
                (before, Some(after)) => {
                    if let Some(before) = before.filter(|b| *b != after) {
                        changes.remove.insert(attr.name.clone(), before.clone());
                    }
                    changes.insert.insert(attr.name.clone(), after.clone());
                }
                (None, None) => {}
            }
        }

        for constraint in &self.schema.unique_together {
            let before: Option<Vec<&String>> =
                constraint.columns.iter().map(|c| old.get(c)).collect();
            let after: Option<Vec<&String>> =
                constraint.columns.iter().map(|c| new.get(c)).collect();
            let name = constraint.name();

            if let Some(before) = &before {
                if after.as_ref() != Some(before) {
                    changes.remove.insert(name.clone(), encode_tuple(before));
                }
            }
            if let Some(after) = &after {
                if before.as_ref() != Some(after) || full {
                    changes.insert.insert(name, encode_tuple(after));
                }
            }
        }

        changes
    }

    /// Finds the first insert whose mapping belongs to another id.
    ///
    /// `lookup(constraint, value)` returns the id currently mapped.
    pub fn check<F>(changes: &UniqueChanges, id: &str, mut lookup: F) -> StoreResult<Option<Conflict>>
    where
        F: FnMut(&str, &str) -> StoreResult<Option<String>>,
    {
        for (constraint, value) in &changes.insert {
            if let Some(owner) = lookup(constraint, value)? {
                if owner != id {
                    return Ok(Some(Conflict {
                        constraint: constraint.clone(),
                        value: value.clone(),
                    }));
                }
            }
        }
        Ok(None)
    }

    /// Removals whose mapping still points at `id`
    pub fn owned_removals<F>(
        changes: &UniqueChanges,
        id: &str,
        mut lookup: F,
    ) -> StoreResult<Vec<(String, String)>>
    where
        F: FnMut(&str, &str) -> StoreResult<Option<String>>,
    {
        let mut owned = Vec::new();
        for (constraint, value) in &changes.remove {
            if lookup(constraint, value)?.as_deref() == Some(id) {
                owned.push((constraint.clone(), value.clone()));
            }
        }
        Ok(owned)
    }
}

fn encode_tuple(values: &[&String]) -> String {
    // Plain strings; serialization cannot fail.
    serde_json::to_string(values).unwrap_or_default()
}
