//! Index entries accumulated for one record before commit

use std::collections::{BTreeMap, BTreeSet};

use super::codec::PrefixCodec;
use super::descriptor::IndexDescriptor;
use super::keys::{membership_entry, scored_entry};

/// New index state of a record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexEntries {
    membership: BTreeSet<String>,
    scored: BTreeMap<String, f64>,
    prefix: Vec<(String, String)>,
    suffix: Vec<(String, String)>,
}

impl IndexEntries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds entries from their stored form; suffix texts are already reversed
    pub fn from_parts(
        membership: BTreeSet<String>,
        scored: BTreeMap<String, f64>,
        prefix: Vec<(String, String)>,
        suffix: Vec<(String, String)>,
    ) -> Self {
        Self {
            membership,
            scored,
            prefix,
            suffix,
        }
    }

    pub fn add_membership(&mut self, attribute: &str, key: &str) {
        self.membership.insert(membership_entry(attribute, key));
    }

    pub fn add_score(&mut self, attribute: &str, subkey: &str, score: f64) {
        self.scored.insert(scored_entry(attribute, subkey), score);
    }

    pub fn add_prefix(&mut self, attribute: &str, text: &str) {
        let pair = (attribute.to_string(), text.to_string());
        if !self.prefix.contains(&pair) {
            self.prefix.push(pair);
        }
    }

    /// Stores the reversed text
    pub fn add_suffix(&mut self, attribute: &str, text: &str) {
        let pair = (attribute.to_string(), PrefixCodec::reverse(text));
        if !self.suffix.contains(&pair) {
            self.suffix.push(pair);
        }
    }

    pub fn membership(&self) -> &BTreeSet<String> {
        &self.membership
    }

    pub fn scored(&self) -> &BTreeMap<String, f64> {
        &self.scored
    }

    pub fn prefix(&self) -> &[(String, String)] {
        &self.prefix
    }

    pub fn suffix(&self) -> &[(String, String)] {
        &self.suffix
    }

    /// Number of index entries
    pub fn len(&self) -> usize {
        self.membership.len() + self.scored.len() + self.prefix.len() + self.suffix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.membership.is_empty()
            && self.scored.is_empty()
            && self.prefix.is_empty()
            && self.suffix.is_empty()
    }

    /// Descriptor listing exactly these entries
    pub fn descriptor(&self) -> IndexDescriptor {
        IndexDescriptor {
            membership: self.membership.iter().cloned().collect(),
            scored: self.scored.keys().cloned().collect(),
            prefix: self.prefix.clone(),
            suffix: self.suffix.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_mirrors_entries() {
        let mut entries = IndexEntries::new();
        entries.add_membership("email", "a@x.com");
        entries.add_score("age", "", 30.0);
        entries.add_score("tags", "red", 1.0);
        entries.add_prefix("name", "alice");
        entries.add_prefix("name", "alice");
        entries.add_suffix("name", "alice");

        let descriptor = entries.descriptor();
        assert_eq!(descriptor.membership, vec!["email:a@x.com"]);
        assert_eq!(descriptor.scored, vec!["age", "tags:red"]);
        assert_eq!(descriptor.prefix, vec![("name".to_string(), "alice".to_string())]);
        assert_eq!(descriptor.suffix, vec![("name".to_string(), "ecila".to_string())]);
    }
}
