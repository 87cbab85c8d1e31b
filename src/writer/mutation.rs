//! Mutation-set computation
//!
//! Turns `(schema, old, new)` into the complete list of primary-data, unique
//! and index mutations of one commit. Pure: nothing here touches the store.

use crate::index::{scored_entry, IndexEntries};
use crate::schema::{AttributeSpec, KeygenOutput, Schema};
use crate::value::{AttributeMap, Value};

use super::errors::{WriteError, WriteResult};
use super::unique::{EncodedMap, UniqueChanges, UniqueConstraintEnforcer};

/// A record change handed to the writer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Change {
    pub id: String,
    /// Attribute values currently stored
    pub old: AttributeMap,
    /// Attribute values after the change
    pub new: AttributeMap,
    /// Rewrite every present attribute, changed or not
    pub full: bool,
    pub delete: bool,
}

impl Change {
    /// A new record
    pub fn create(id: impl Into<String>, new: AttributeMap) -> Self {
        Self {
            id: id.into(),
            new,
            ..Self::default()
        }
    }

    /// An update of a stored record
    pub fn update(id: impl Into<String>, old: AttributeMap, new: AttributeMap) -> Self {
        Self {
            id: id.into(),
            old,
            new,
            ..Self::default()
        }
    }

    /// Removal of a stored record
    pub fn delete(id: impl Into<String>, old: AttributeMap) -> Self {
        Self {
            id: id.into(),
            old,
            delete: true,
            ..Self::default()
        }
    }

    /// Forces a full rewrite
    pub fn full(mut self) -> Self {
        self.full = true;
        self
    }
}

/// Everything one commit writes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationSet {
    pub namespace: String,
    pub id: String,
    pub unique: UniqueChanges,
    /// Fields removed from the primary hash
    pub deleted: Vec<String>,
    /// Fields written to the primary hash, with encoded values
    pub changed: Vec<(String, String)>,
    /// Index state after the commit
    pub entries: IndexEntries,
    pub delete: bool,
    /// Attributes written or removed
    pub changes: usize,
}

impl MutationSet {
    /// Computes the mutation set of `change` under `schema`.
    ///
    /// Unknown attributes, values of the wrong kind and non-finite index
    /// scores are rejected here, before anything reaches the store.
    pub fn compute(schema: &Schema, change: &Change) -> WriteResult<Self> {
        if change.id.is_empty() {
            return Err(WriteError::MissingId);
        }
        let old = encode_all(schema, &change.old)?;
        let new = if change.delete {
            EncodedMap::new()
        } else {
            encode_all(schema, &change.new)?
        };

        let mut set = MutationSet {
            namespace: schema.namespace.clone(),
            id: change.id.clone(),
            delete: change.delete,
            ..Self::default()
        };

        for attr in &schema.attributes {
            let before = old.get(&attr.name);
            let after = new.get(&attr.name);

            if !change.delete && attr.has_index() {
                if let Some(value) = change.new.get(&attr.name) {
                    collect_entries(&mut set.entries, attr, value)?;
                }
            }

            if before == after && !change.full {
                continue;
            }

            match (before, after) {
                (Some(_), None) => {
                    set.deleted.push(attr.name.clone());
                    set.changes += 1;
                }
                (_, Some(after)) => {
                    set.changed.push((attr.name.clone(), after.clone()));
                    set.changes += 1;
                }
                (None, None) => {}
            }
        }

        set.unique = UniqueConstraintEnforcer::new(schema).plan(&old, &new, change.full);
        Ok(set)
    }
}

fn encode_all(schema: &Schema, values: &AttributeMap) -> WriteResult<EncodedMap> {
    let mut encoded = EncodedMap::new();
    for (name, value) in values {
        let attr = schema.get(name).ok_or_else(|| WriteError::UnknownAttribute {
            namespace: schema.namespace.clone(),
            attribute: name.clone(),
        })?;
        value
            .expect_kind(attr.kind)
            .map_err(|source| WriteError::Value {
                attribute: name.clone(),
                source,
            })?;
        encoded.insert(name.clone(), value.encode());
    }
    Ok(encoded)
}

fn collect_entries(
    entries: &mut IndexEntries,
    attr: &AttributeSpec,
    value: &Value,
) -> WriteResult<()> {
    match attr.effective_keygen().generate(value) {
        KeygenOutput::Keys(keys) => {
            for key in &keys {
                if attr.indexed {
                    entries.add_membership(&attr.name, key);
                }
                if attr.prefix {
                    entries.add_prefix(&attr.name, key);
                }
                if attr.suffix {
                    entries.add_suffix(&attr.name, key);
                }
            }
        }
        KeygenOutput::Scores(scores) => {
            if attr.indexed {
                for (subkey, score) in &scores {
                    // ZADD has no NaN and the script ARGV has no infinity
                    if !score.is_finite() {
                        return Err(WriteError::NonFiniteScore {
                            attribute: attr.name.clone(),
                            index: scored_entry(&attr.name, subkey),
                            score: *score,
                        });
                    }
                    entries.add_score(&attr.name, subkey, *score);
                }
            }
        }
        KeygenOutput::Nothing => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Keygen;
    use crate::value::ValueKind;

    fn schema() -> Schema {
        Schema::new("User")
            .attribute(
                AttributeSpec::new("email", ValueKind::Text)
                    .unique()
                    .prefix()
                    .suffix()
                    .keygen(Keygen::IdentityCi),
            )
            .attribute(AttributeSpec::new("age", ValueKind::Integer).indexed())
            .attribute(AttributeSpec::new("bio", ValueKind::Text))
    }

    fn attrs(pairs: &[(&str, Value)]) -> AttributeMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_create() {
        let change = Change::create(
            "1",
            attrs(&[("email", "A@x.com".into()), ("age", 30.into())]),
        );
        let set = MutationSet::compute(&schema(), &change).unwrap();

        assert_eq!(set.changes, 2);
        assert_eq!(
            set.changed,
            vec![("email".to_string(), "A@x.com".to_string()), ("age".to_string(), "30".to_string())]
        );
        assert_eq!(set.entries.scored().get("age"), Some(&30.0));
        assert_eq!(set.entries.prefix(), &[("email".to_string(), "a@x.com".to_string())]);
        assert_eq!(set.entries.suffix(), &[("email".to_string(), "moc.x@a".to_string())]);
        assert!(set.entries.membership().is_empty());
        assert_eq!(set.unique.insert["email"], "A@x.com");
    }

    #[test]
    fn test_unchanged_attributes_still_indexed() {
        let old = attrs(&[("email", "a@x.com".into()), ("age", 30.into())]);
        let new = attrs(&[("email", "a@x.com".into()), ("age", 31.into())]);
        let set = MutationSet::compute(&schema(), &Change::update("1", old, new)).unwrap();

        assert_eq!(set.changes, 1);
        assert_eq!(set.changed, vec![("age".to_string(), "31".to_string())]);
        assert_eq!(set.entries.prefix().len(), 1);
        assert!(set.unique.is_empty());
    }

    #[test]
    fn test_removed_attribute() {
        let old = attrs(&[("bio", "hi".into()), ("age", 30.into())]);
        let new = attrs(&[("age", 30.into())]);
        let set = MutationSet::compute(&schema(), &Change::update("1", old, new)).unwrap();

        assert_eq!(set.deleted, vec!["bio"]);
        assert!(set.changed.is_empty());
        assert_eq!(set.changes, 1);
    }

    #[test]
    fn test_full_rewrites_everything_present() {
        let data = attrs(&[("bio", "hi".into()), ("age", 30.into())]);
        let set = MutationSet::compute(&schema(), &Change::update("1", data.clone(), data).full())
            .unwrap();
        assert_eq!(set.changes, 2);
    }

    #[test]
    fn test_delete() {
        let old = attrs(&[("email", "a@x.com".into()), ("age", 30.into())]);
        let set = MutationSet::compute(&schema(), &Change::delete("1", old)).unwrap();

        assert!(set.delete);
        assert!(set.entries.is_empty());
        assert_eq!(set.deleted, vec!["email", "age"]);
        assert_eq!(set.unique.remove["email"], "a@x.com");
    }

    #[test]
    fn test_rejects_bad_input() {
        let change = Change::create("1", attrs(&[("nope", 1.into())]));
        let err = MutationSet::compute(&schema(), &change).unwrap_err();
        assert_eq!(err.code(), "REDEX_WRITE_UNKNOWN_ATTRIBUTE");

        let change = Change::create("1", attrs(&[("age", "thirty".into())]));
        let err = MutationSet::compute(&schema(), &change).unwrap_err();
        assert_eq!(err.code(), "REDEX_VALUE_KIND_MISMATCH");

        let change = Change::create("1", attrs(&[("age", f64::NAN.into())]));
        let err = MutationSet::compute(&schema(), &change).unwrap_err();
        assert_eq!(err.code(), "REDEX_VALUE_KIND_MISMATCH");

        let change = Change::create("", AttributeMap::new());
        assert_eq!(
            MutationSet::compute(&schema(), &change).unwrap_err(),
            WriteError::MissingId
        );
    }

    #[test]
    fn test_rejects_non_finite_scores() {
        let schema = Schema::new("T")
            .attribute(AttributeSpec::new("score", ValueKind::Float).indexed())
            .attribute(AttributeSpec::new("note", ValueKind::Float));

        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let change = Change::create("1", attrs(&[("score", bad.into())]));
            match MutationSet::compute(&schema, &change).unwrap_err() {
                WriteError::NonFiniteScore { attribute, index, .. } => {
                    assert_eq!(attribute, "score");
                    assert_eq!(index, "score");
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }

        // Unindexed floats never become scores
        let change = Change::create("1", attrs(&[("note", f64::INFINITY.into())]));
        assert!(MutationSet::compute(&schema, &change).is_ok());
    }
}
