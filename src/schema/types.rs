//! Schema type definitions
//!
//! A schema is an explicit capability record per namespace: attribute kinds,
//! which index kinds each attribute feeds, its keygen, and the composite
//! unique constraints. Schemas are built with the builder methods below or
//! deserialized from JSON, e.g.
//!
//! ```json
//! {
//!   "namespace": "User",
//!   "attributes": [
//!     {"name": "email", "kind": "text", "unique": true, "suffix": true, "keygen": "identity_ci"},
//!     {"name": "age", "kind": "integer", "indexed": true}
//!   ],
//!   "unique_together": [["first", "last"]]
//! }
//! ```

use serde::{Deserialize, Serialize};

use super::keygen::Keygen;
use crate::value::ValueKind;

/// Attribute definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeSpec {
    pub name: String,
    pub kind: ValueKind,
    #[serde(default)]
    pub indexed: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub prefix: bool,
    #[serde(default)]
    pub suffix: bool,
    /// Explicit keygen; the kind's default applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keygen: Option<Keygen>,
}

impl AttributeSpec {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            indexed: false,
            unique: false,
            prefix: false,
            suffix: false,
            keygen: None,
        }
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn prefix(mut self) -> Self {
        self.prefix = true;
        self
    }

    pub fn suffix(mut self) -> Self {
        self.suffix = true;
        self
    }

    pub fn keygen(mut self, keygen: Keygen) -> Self {
        self.keygen = Some(keygen);
        self
    }

    /// Keygen in effect: the explicit one, else `Numeric` for numeric kinds
    /// and `Identity` otherwise
    pub fn effective_keygen(&self) -> Keygen {
        match &self.keygen {
            Some(keygen) => keygen.clone(),
            None if self.kind.is_numeric() => Keygen::Numeric,
            None => Keygen::Identity,
        }
    }

    /// Whether the attribute feeds range indexes
    pub fn is_scored(&self) -> bool {
        self.indexed && self.effective_keygen().is_scored()
    }

    /// Whether any index is derived from this attribute
    pub fn has_index(&self) -> bool {
        self.indexed || self.prefix || self.suffix
    }
}

/// Multi-column unique constraint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositeUnique {
    pub columns: Vec<String>,
}

impl CompositeUnique {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Constraint name: the columns joined by `:` in declared order
    pub fn name(&self) -> String {
        self.columns.join(":")
    }
}

/// Complete schema of one namespace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    pub namespace: String,
    pub attributes: Vec<AttributeSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unique_together: Vec<CompositeUnique>,
}

impl Schema {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            attributes: Vec::new(),
            unique_together: Vec::new(),
        }
    }

    /// Appends an attribute
    pub fn attribute(mut self, spec: AttributeSpec) -> Self {
        self.attributes.push(spec);
        self
    }

    /// Appends a composite unique constraint
    pub fn unique_together<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique_together.push(CompositeUnique::new(columns));
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Single-column unique attributes in declared order
    pub fn unique_columns(&self) -> impl Iterator<Item = &AttributeSpec> {
        self.attributes.iter().filter(|a| a.unique)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let schema = Schema::new("User")
            .attribute(AttributeSpec::new("email", ValueKind::Text).unique().suffix())
            .attribute(AttributeSpec::new("age", ValueKind::Integer).indexed())
            .unique_together(["first", "last"]);

        assert_eq!(schema.unique_columns().count(), 1);
        assert!(schema.get("age").unwrap().is_scored());
        assert!(!schema.get("email").unwrap().is_scored());
        assert_eq!(schema.unique_together[0].name(), "first:last");
    }

    #[test]
    fn test_default_keygen() {
        let age = AttributeSpec::new("age", ValueKind::Float);
        assert!(matches!(age.effective_keygen(), Keygen::Numeric));
        let name = AttributeSpec::new("name", ValueKind::Text);
        assert!(matches!(name.effective_keygen(), Keygen::Identity));
        let name = name.keygen(Keygen::FullText);
        assert!(matches!(name.effective_keygen(), Keygen::FullText));
    }

    #[test]
    fn test_json_form() {
        let schema: Schema = serde_json::from_value(json!({
            "namespace": "User",
            "attributes": [
                {"name": "email", "kind": "text", "unique": true, "keygen": "identity_ci"},
                {"name": "born", "kind": "date", "indexed": true}
            ],
            "unique_together": [["email", "born"]]
        }))
        .unwrap();

        let email = schema.get("email").unwrap();
        assert!(email.unique && !email.indexed);
        assert!(matches!(email.keygen, Some(Keygen::IdentityCi)));
        assert_eq!(schema.get("born").unwrap().kind, ValueKind::Date);
        assert_eq!(schema.unique_together[0].columns, vec!["email", "born"]);
    }
}
