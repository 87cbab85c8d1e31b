//! Physical key layout
//!
//! ```text
//! <ns>:<id>                 primary hash
//! <ns>::                    id -> descriptor JSON
//! <ns>:<attr>:<key>:idx     membership set
//! <ns>:<attr>[:<sub>]:idx   range sorted set
//! <ns>:<cols>:uidx          unique hash, cols joined by ':'
//! <ns>:<attr>:pre           prefix sorted set, members "text\0id"
//! <ns>:<attr>:suf           suffix sorted set, members "reversed\0id"
//! <ns>:cache:<fingerprint>  cached query result
//! ```

/// Separator between the indexed text and the id inside `:pre`/`:suf` members
pub const MEMBER_SEPARATOR: char = '\0';

/// Key builder for one namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyLayout {
    namespace: String,
}

impl KeyLayout {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn primary(&self, id: &str) -> String {
        format!("{}:{}", self.namespace, id)
    }

    pub fn descriptor(&self) -> String {
        format!("{}::", self.namespace)
    }

    /// Key for a descriptor entry of the membership or scored lists
    /// (`attr:key` or `attr[:sub]`)
    pub fn index(&self, entry: &str) -> String {
        format!("{}:{}:idx", self.namespace, entry)
    }

    pub fn membership(&self, attribute: &str, key: &str) -> String {
        self.index(&membership_entry(attribute, key))
    }

    pub fn scored(&self, attribute: &str) -> String {
        self.index(attribute)
    }

    pub fn unique(&self, constraint: &str) -> String {
        format!("{}:{}:uidx", self.namespace, constraint)
    }

    pub fn prefix(&self, attribute: &str) -> String {
        format!("{}:{}:pre", self.namespace, attribute)
    }

    pub fn suffix(&self, attribute: &str) -> String {
        format!("{}:{}:suf", self.namespace, attribute)
    }

    pub fn cache(&self, fingerprint: &str) -> String {
        format!("{}:cache:{}", self.namespace, fingerprint)
    }
}

/// Descriptor entry naming a membership set
pub fn membership_entry(attribute: &str, key: &str) -> String {
    format!("{}:{}", attribute, key)
}

/// Descriptor entry naming a scored index; an empty subkey is the attribute's own index
pub fn scored_entry(attribute: &str, subkey: &str) -> String {
    if subkey.is_empty() {
        attribute.to_string()
    } else {
        format!("{}:{}", attribute, subkey)
    }
}

/// Packs a prefix/suffix member
pub fn pack_member(text: &str, id: &str) -> String {
    format!("{}{}{}", text, MEMBER_SEPARATOR, id)
}

/// Splits a packed member into `(text, id)` at the last separator
pub fn unpack_member(member: &str) -> Option<(&str, &str)> {
    member.rsplit_once(MEMBER_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let keys = KeyLayout::new("User");
        assert_eq!(keys.primary("42"), "User:42");
        assert_eq!(keys.descriptor(), "User::");
        assert_eq!(keys.membership("email", "a@x.com"), "User:email:a@x.com:idx");
        assert_eq!(keys.scored("age"), "User:age:idx");
        assert_eq!(keys.index(&scored_entry("tags", "red")), "User:tags:red:idx");
        assert_eq!(keys.unique("first:last"), "User:first:last:uidx");
        assert_eq!(keys.prefix("name"), "User:name:pre");
        assert_eq!(keys.suffix("name"), "User:name:suf");
        assert_eq!(keys.cache("abc"), "User:cache:abc");
    }

    #[test]
    fn test_member_packing() {
        let member = pack_member("alice", "7");
        assert_eq!(member, "alice\u{0}7");
        assert_eq!(unpack_member(&member), Some(("alice", "7")));
        assert_eq!(unpack_member("no-separator"), None);
    }
}
