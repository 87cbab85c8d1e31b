//! Per-record index descriptor
//!
//! Stored as JSON in the `<ns>::` hash under the record id:
//! `[membership, scored, [[attr, text], ...], [[attr, reversed], ...]]`.
//! The two-list legacy form `[membership, scored]` is still accepted.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Every index entry written for one record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexDescriptor {
    /// Membership set entries, `attr:key`
    pub membership: Vec<String>,
    /// Range index entries, `attr` or `attr:sub`
    pub scored: Vec<String>,
    /// `(attr, text)` pairs in the prefix sets
    pub prefix: Vec<(String, String)>,
    /// `(attr, reversed text)` pairs in the suffix sets
    pub suffix: Vec<(String, String)>,
}

impl IndexDescriptor {
    pub fn is_empty(&self) -> bool {
        self.membership.is_empty()
            && self.scored.is_empty()
            && self.prefix.is_empty()
            && self.suffix.is_empty()
    }

    /// Encodes the descriptor for storage
    pub fn to_json(&self) -> String {
        // Only strings inside; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Decodes a stored descriptor
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Wire {
    Full(
        Vec<String>,
        Vec<String>,
        Vec<(String, String)>,
        Vec<(String, String)>,
    ),
    Legacy(Vec<String>, Vec<String>),
}

impl Serialize for IndexDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.membership, &self.scored, &self.prefix, &self.suffix).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for IndexDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Wire::deserialize(deserializer)? {
            Wire::Full(membership, scored, prefix, suffix) => IndexDescriptor {
                membership,
                scored,
                prefix,
                suffix,
            },
            Wire::Legacy(membership, scored) => IndexDescriptor {
                membership,
                scored,
                ..Default::default()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_layout() {
        let descriptor = IndexDescriptor {
            membership: vec!["email:a@x.com".into()],
            scored: vec!["age".into()],
            prefix: vec![("name".into(), "alice".into())],
            suffix: vec![("name".into(), "ecila".into())],
        };
        assert_eq!(
            descriptor.to_json(),
            r#"[["email:a@x.com"],["age"],[["name","alice"]],[["name","ecila"]]]"#
        );
        assert_eq!(IndexDescriptor::from_json(&descriptor.to_json()).unwrap(), descriptor);
    }

    #[test]
    fn test_legacy_form() {
        let descriptor = IndexDescriptor::from_json(r#"[["flag:1"],["age"]]"#).unwrap();
        assert_eq!(descriptor.membership, vec!["flag:1"]);
        assert_eq!(descriptor.scored, vec!["age"]);
        assert!(descriptor.prefix.is_empty());
        assert!(descriptor.suffix.is_empty());
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(IndexDescriptor::from_json("{}").is_err());
        assert!(IndexDescriptor::from_json(r#"[["a"]]"#).is_err());
        assert!(IndexDescriptor::from_json(r#"[[],[],[["only-attr"]],[]]"#).is_err());
    }
}
