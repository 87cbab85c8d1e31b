//! Query structures
//!
//! A query is a namespace, a conjunction of per-attribute filters, an
//! optional ordering and an optional window. Builder methods return a new
//! query, leaving the original untouched.
//!
//! Queries also deserialize from JSON for the CLI:
//!
//! ```json
//! {
//!   "namespace": "User",
//!   "filters": [
//!     {"attribute": "age", "range": {"min": 18, "max": null}},
//!     {"attribute": "email", "prefix": "al"}
//!   ],
//!   "order_by": "-age",
//!   "limit": [0, 10]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Condition on one attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterPredicate {
    /// Exact match
    Equality(Value),
    /// Inclusive score range; `None` is an open bound
    Range {
        #[serde(default)]
        min: Option<Value>,
        #[serde(default)]
        max: Option<Value>,
    },
    /// Any of the values
    OneOf(Vec<Value>),
    /// Indexed text starts with
    Prefix(String),
    /// Indexed text ends with
    Suffix(String),
    /// Wildcard pattern: `?` 0-1 chars, `*` 0+, `+` 1+, `!` exactly 1
    Pattern(String),
}

impl FilterPredicate {
    /// Short name used in plans and errors
    pub fn name(&self) -> &'static str {
        match self {
            FilterPredicate::Equality(_) => "equality",
            FilterPredicate::Range { .. } => "range",
            FilterPredicate::OneOf(_) => "one_of",
            FilterPredicate::Prefix(_) => "prefix",
            FilterPredicate::Suffix(_) => "suffix",
            FilterPredicate::Pattern(_) => "pattern",
        }
    }
}

/// A predicate bound to an attribute
///
/// `attribute` may be `attr:subkey` to target a keygen sub-index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub attribute: String,
    #[serde(flatten)]
    pub predicate: FilterPredicate,
}

/// Result ordering by an attribute's range index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    pub attribute: String,
    pub descending: bool,
}

impl Ordering {
    /// Parses `attr` (ascending) or `-attr` (descending)
    pub fn parse(spec: &str) -> Self {
        match spec.strip_prefix('-') {
            Some(attribute) => Self {
                attribute: attribute.to_string(),
                descending: true,
            },
            None => Self {
                attribute: spec.to_string(),
                descending: false,
            },
        }
    }
}

impl Serialize for Ordering {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.descending {
            serializer.serialize_str(&format!("-{}", self.attribute))
        } else {
            serializer.serialize_str(&self.attribute)
        }
    }
}

impl<'de> Deserialize<'de> for Ordering {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let spec = String::deserialize(deserializer)?;
        Ok(Ordering::parse(&spec))
    }
}

/// A query over one namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub namespace: String,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<Ordering>,
    /// `(offset, count)` applied to the ordered result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<(usize, usize)>,
}

impl Query {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    /// Adds a predicate on `attribute`
    pub fn with(&self, attribute: impl Into<String>, predicate: FilterPredicate) -> Self {
        let mut query = self.clone();
        query.filters.push(Filter {
            attribute: attribute.into(),
            predicate,
        });
        query
    }

    /// `attribute == value`
    pub fn filter(&self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(attribute, FilterPredicate::Equality(value.into()))
    }

    /// `min <= attribute <= max`
    pub fn range(
        &self,
        attribute: impl Into<String>,
        min: Option<Value>,
        max: Option<Value>,
    ) -> Self {
        self.with(attribute, FilterPredicate::Range { min, max })
    }

    pub fn one_of<I, V>(&self, attribute: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.with(attribute, FilterPredicate::OneOf(values))
    }

    pub fn startswith(&self, attribute: impl Into<String>, text: impl Into<String>) -> Self {
        self.with(attribute, FilterPredicate::Prefix(text.into()))
    }

    pub fn endswith(&self, attribute: impl Into<String>, text: impl Into<String>) -> Self {
        self.with(attribute, FilterPredicate::Suffix(text.into()))
    }

    pub fn like(&self, attribute: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.with(attribute, FilterPredicate::Pattern(pattern.into()))
    }

    /// Orders by `attr`, or by `-attr` for descending
    pub fn order_by(&self, spec: &str) -> Self {
        let mut query = self.clone();
        query.order_by = Some(Ordering::parse(spec));
        query
    }

    /// Keeps `count` results starting at `offset`
    pub fn limit(&self, offset: usize, count: usize) -> Self {
        let mut query = self.clone();
        query.limit = Some((offset, count));
        query
    }

    /// Parses a JSON query
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}
