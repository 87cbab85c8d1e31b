//! Index registry for one namespace
//!
//! Owns the four index kinds:
//! - membership sets (`SADD`/`SREM`, exact match and OR lookups)
//! - range sorted sets (`ZADD`/`ZREM`, score ranges and ordering)
//! - prefix sorted sets (packed `text\0id` members scored by `PrefixCodec`)
//! - suffix sorted sets (same, over the reversed text)
//!
//! # Invariants
//!
//! - `index()` always removes the previous descriptor's entries in the same
//!   batch and ends by persisting the new descriptor
//! - `unindex()` removes exactly what the stored descriptor names; it never
//!   recomputes entries from attribute values
//! - scan results are verified against the stored text, since scores are
//!   only a superset filter

use std::collections::{BTreeSet, HashMap};

use crate::store::{Batch, ScoreRange, Store};

use super::codec::PrefixCodec;
use super::descriptor::IndexDescriptor;
use super::entries::IndexEntries;
use super::errors::{IndexError, IndexResult};
use super::keys::{pack_member, unpack_member, KeyLayout};
use super::pattern::LikePattern;

/// Index maintenance and search primitives for a namespace
#[derive(Debug, Clone)]
pub struct IndexRegistry {
    keys: KeyLayout,
}

impl IndexRegistry {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            keys: KeyLayout::new(namespace),
        }
    }

    pub fn keys(&self) -> &KeyLayout {
        &self.keys
    }

    // ==================================================================
    // Maintenance
    // ==================================================================

    /// Decodes a raw descriptor read from the `<ns>::` hash
    pub fn decode_descriptor(&self, id: &str, raw: &str) -> IndexResult<IndexDescriptor> {
        IndexDescriptor::from_json(raw).map_err(|e| IndexError::Descriptor {
            namespace: self.keys.namespace().to_string(),
            id: id.to_string(),
            reason: e.to_string(),
        })
    }

    /// Reads the stored descriptor of a record
    pub fn load_descriptor(
        &self,
        store: &dyn Store,
        id: &str,
    ) -> IndexResult<Option<IndexDescriptor>> {
        match store.hget(&self.keys.descriptor(), id)? {
            Some(raw) => self.decode_descriptor(id, &raw).map(Some),
            None => Ok(None),
        }
    }

    /// Queues the replacement of `previous` by `entries`
    pub fn index(
        &self,
        batch: &mut Batch,
        id: &str,
        entries: &IndexEntries,
        previous: Option<&IndexDescriptor>,
    ) {
        if let Some(previous) = previous {
            self.remove_entries(batch, id, previous);
        }

        for entry in entries.membership() {
            batch.sadd(self.keys.index(entry), id);
        }
        for (entry, score) in entries.scored() {
            batch.zadd(self.keys.index(entry), *score, id);
        }
        for (attribute, text) in entries.prefix() {
            batch.zadd(
                self.keys.prefix(attribute),
                PrefixCodec::score(text),
                pack_member(text, id),
            );
        }
        for (attribute, text) in entries.suffix() {
            batch.zadd(
                self.keys.suffix(attribute),
                PrefixCodec::score(text),
                pack_member(text, id),
            );
        }

        if entries.is_empty() {
            batch.hdel(self.keys.descriptor(), id);
        } else {
            batch.hset(self.keys.descriptor(), id, entries.descriptor().to_json());
        }
    }

    /// Queues removal of every entry named in `descriptor` and of the descriptor itself
    pub fn unindex(&self, batch: &mut Batch, id: &str, descriptor: &IndexDescriptor) {
        self.remove_entries(batch, id, descriptor);
        batch.hdel(self.keys.descriptor(), id);
    }

    fn remove_entries(&self, batch: &mut Batch, id: &str, descriptor: &IndexDescriptor) {
        for entry in &descriptor.membership {
            batch.srem(self.keys.index(entry), id);
        }
        for entry in &descriptor.scored {
            batch.zrem(self.keys.index(entry), id);
        }
        for (attribute, text) in &descriptor.prefix {
            batch.zrem(self.keys.prefix(attribute), pack_member(text, id));
        }
        for (attribute, text) in &descriptor.suffix {
            batch.zrem(self.keys.suffix(attribute), pack_member(text, id));
        }
    }

    // ==================================================================
    // Search primitives
    // ==================================================================

    /// Ids in the membership set of `attribute = key`
    pub fn members(
        &self,
        store: &dyn Store,
        attribute: &str,
        key: &str,
    ) -> IndexResult<BTreeSet<String>> {
        Ok(store.smembers(&self.keys.membership(attribute, key))?)
    }

    /// Ids in any of the membership sets of `attribute`
    pub fn union(
        &self,
        store: &dyn Store,
        attribute: &str,
        keys: &[String],
    ) -> IndexResult<BTreeSet<String>> {
        let mut ids = BTreeSet::new();
        for key in keys {
            ids.extend(self.members(store, attribute, key)?);
        }
        Ok(ids)
    }

    /// `(id, score)` pairs of a range index, ascending
    pub fn range(
        &self,
        store: &dyn Store,
        entry: &str,
        range: ScoreRange,
    ) -> IndexResult<Vec<(String, f64)>> {
        Ok(store.zrange_by_score(&self.keys.index(entry), range)?)
    }

    /// Every score of a range index, keyed by id
    pub fn scores(&self, store: &dyn Store, entry: &str) -> IndexResult<HashMap<String, f64>> {
        Ok(self.range(store, entry, ScoreRange::all())?.into_iter().collect())
    }

    pub fn score(&self, store: &dyn Store, entry: &str, id: &str) -> IndexResult<Option<f64>> {
        Ok(store.zscore(&self.keys.index(entry), id)?)
    }

    /// Ids with an indexed text of `attribute` starting with `text`
    pub fn prefix_scan(
        &self,
        store: &dyn Store,
        attribute: &str,
        text: &str,
    ) -> IndexResult<BTreeSet<String>> {
        self.text_scan(store, &self.keys.prefix(attribute), text, |t| {
            t.starts_with(text)
        })
    }

    /// Ids with an indexed text of `attribute` ending with `text`
    pub fn suffix_scan(
        &self,
        store: &dyn Store,
        attribute: &str,
        text: &str,
    ) -> IndexResult<BTreeSet<String>> {
        let reversed = PrefixCodec::reverse(text);
        self.text_scan(store, &self.keys.suffix(attribute), &reversed, |t| {
            t.starts_with(&reversed)
        })
    }

    /// Ids with an indexed text of `attribute` matching a wildcard pattern
    pub fn pattern_scan(
        &self,
        store: &dyn Store,
        attribute: &str,
        pattern: &LikePattern,
    ) -> IndexResult<BTreeSet<String>> {
        self.text_scan(
            store,
            &self.keys.prefix(attribute),
            pattern.literal_prefix(),
            |t| pattern.is_match(t),
        )
    }

    fn text_scan(
        &self,
        store: &dyn Store,
        key: &str,
        lead: &str,
        verify: impl Fn(&str) -> bool,
    ) -> IndexResult<BTreeSet<String>> {
        let range = ScoreRange::between(PrefixCodec::score(lead), PrefixCodec::score_next(lead));
        let mut ids = BTreeSet::new();
        for (member, _) in store.zrange_by_score(key, range)? {
            if let Some((text, id)) = unpack_member(&member) {
                if text.starts_with(lead) && verify(text) {
                    ids.insert(id.to_string());
                }
            }
        }
        Ok(ids)
    }

    // ==================================================================
    // Cardinality shortcuts
    // ==================================================================

    /// `SCARD` of a membership set
    pub fn count_members(&self, store: &dyn Store, attribute: &str, key: &str) -> IndexResult<usize> {
        Ok(store.scard(&self.keys.membership(attribute, key))?)
    }

    /// `ZCOUNT` of a range index
    pub fn count_range(&self, store: &dyn Store, entry: &str, range: ScoreRange) -> IndexResult<usize> {
        Ok(store.zcount(&self.keys.index(entry), range)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn entries_for(name: &str, age: f64) -> IndexEntries {
        let mut entries = IndexEntries::new();
        entries.add_membership("name", name);
        entries.add_score("age", "", age);
        entries.add_prefix("name", name);
        entries.add_suffix("name", name);
        entries
    }

    fn write(store: &MemoryStore, registry: &IndexRegistry, id: &str, entries: &IndexEntries) {
        let previous = registry.load_descriptor(store, id).unwrap();
        let mut batch = Batch::new();
        registry.index(&mut batch, id, entries, previous.as_ref());
        assert!(store.exec(None, batch).unwrap());
    }

    #[test]
    fn test_index_then_search() {
        let store = MemoryStore::new();
        let registry = IndexRegistry::new("User");
        write(&store, &registry, "1", &entries_for("alice", 30.0));
        write(&store, &registry, "2", &entries_for("alicia", 40.0));
        write(&store, &registry, "3", &entries_for("bob", 50.0));

        let ids = registry.members(&store, "name", "bob").unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["3"]);

        let ids = registry.prefix_scan(&store, "name", "ali").unwrap();
        assert_eq!(ids.len(), 2);

        let ids = registry.suffix_scan(&store, "name", "cia").unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["2"]);

        let hits = registry.range(&store, "age", ScoreRange::between(35.0, 50.0)).unwrap();
        assert_eq!(hits, vec![("2".to_string(), 40.0), ("3".to_string(), 50.0)]);

        assert_eq!(registry.count_range(&store, "age", ScoreRange::all()).unwrap(), 3);
        assert_eq!(registry.count_members(&store, "name", "alice").unwrap(), 1);
    }

    #[test]
    fn test_reindex_replaces_previous_entries() {
        let store = MemoryStore::new();
        let registry = IndexRegistry::new("User");
        write(&store, &registry, "1", &entries_for("alice", 30.0));
        write(&store, &registry, "1", &entries_for("carol", 31.0));

        assert!(registry.members(&store, "name", "alice").unwrap().is_empty());
        assert!(registry.prefix_scan(&store, "name", "al").unwrap().is_empty());
        assert_eq!(registry.score(&store, "age", "1").unwrap(), Some(31.0));

        let descriptor = registry.load_descriptor(&store, "1").unwrap().unwrap();
        assert_eq!(descriptor, entries_for("carol", 31.0).descriptor());
    }

    #[test]
    fn test_unindex_removes_everything() {
        let store = MemoryStore::new();
        let registry = IndexRegistry::new("User");
        write(&store, &registry, "1", &entries_for("alice", 30.0));

        let descriptor = registry.load_descriptor(&store, "1").unwrap().unwrap();
        let mut batch = Batch::new();
        registry.unindex(&mut batch, "1", &descriptor);
        store.exec(None, batch).unwrap();

        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn test_pattern_scan() {
        let store = MemoryStore::new();
        let registry = IndexRegistry::new("User");
        write(&store, &registry, "1", &entries_for("frank@x.com", 1.0));
        write(&store, &registry, "2", &entries_for("bigfrank@y.com", 2.0));
        write(&store, &registry, "3", &entries_for("fred@x.com", 3.0));

        let pattern = LikePattern::compile("*frank*@").unwrap();
        let ids = registry.pattern_scan(&store, "name", &pattern).unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["1", "2"]);

        let pattern = LikePattern::compile("fr!nk").unwrap();
        let ids = registry.pattern_scan(&store, "name", &pattern).unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["1"]);
    }

    #[test]
    fn test_malformed_descriptor() {
        let store = MemoryStore::new();
        let registry = IndexRegistry::new("User");
        store.hset("User::", "1", "not json").unwrap();
        let err = registry.load_descriptor(&store, "1").unwrap_err();
        assert_eq!(err.code(), "REDEX_INDEX_DESCRIPTOR");
    }
}
