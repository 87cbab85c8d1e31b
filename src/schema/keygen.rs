//! Index key generators
//!
//! A keygen turns an attribute value into index entries:
//! - `Keys`: membership keys, also used as prefix/suffix texts
//! - `Scores`: subkey -> score, the empty subkey is the attribute's own range index
//! - `Nothing`: the value is not indexed

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Output of a keygen for one value
#[derive(Debug, Clone, PartialEq)]
pub enum KeygenOutput {
    Keys(BTreeSet<String>),
    Scores(BTreeMap<String, f64>),
    Nothing,
}

impl KeygenOutput {
    fn keys<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let keys: BTreeSet<String> = iter.into_iter().filter(|k| !k.is_empty()).collect();
        if keys.is_empty() {
            KeygenOutput::Nothing
        } else {
            KeygenOutput::Keys(keys)
        }
    }

    fn score(score: f64) -> Self {
        KeygenOutput::Scores(BTreeMap::from([(String::new(), score)]))
    }
}

type KeygenFn = dyn Fn(&Value) -> KeygenOutput + Send + Sync;

/// User supplied keygen
#[derive(Clone)]
pub struct CustomKeygen {
    scored: bool,
    func: Arc<KeygenFn>,
}

impl CustomKeygen {
    pub fn is_scored(&self) -> bool {
        self.scored
    }

    pub fn call(&self, value: &Value) -> KeygenOutput {
        (self.func)(value)
    }
}

impl fmt::Debug for CustomKeygen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomKeygen")
            .field("scored", &self.scored)
            .finish_non_exhaustive()
    }
}

/// Key generator attached to an attribute
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Keygen {
    /// The value's own score
    Numeric,
    /// 1.0 for truthy values, 0.0 otherwise
    Boolean,
    /// The encoded value as one key
    Identity,
    /// Lowercased encoded value as one key
    IdentityCi,
    /// Whitespace separated words
    Simple,
    /// Lowercased whitespace separated words
    SimpleCi,
    /// Lowercased words with punctuation stripped
    FullText,
    #[serde(skip)]
    Custom(CustomKeygen),
}

impl Keygen {
    /// Custom keygen producing membership keys
    pub fn custom_keys<F>(func: F) -> Self
    where
        F: Fn(&Value) -> KeygenOutput + Send + Sync + 'static,
    {
        Keygen::Custom(CustomKeygen {
            scored: false,
            func: Arc::new(func),
        })
    }

    /// Custom keygen producing range scores
    pub fn custom_scores<F>(func: F) -> Self
    where
        F: Fn(&Value) -> KeygenOutput + Send + Sync + 'static,
    {
        Keygen::Custom(CustomKeygen {
            scored: true,
            func: Arc::new(func),
        })
    }

    /// Whether this keygen feeds range indexes rather than membership sets
    pub fn is_scored(&self) -> bool {
        match self {
            Keygen::Numeric | Keygen::Boolean => true,
            Keygen::Custom(custom) => custom.is_scored(),
            _ => false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Keygen::Numeric => "numeric",
            Keygen::Boolean => "boolean",
            Keygen::Identity => "identity",
            Keygen::IdentityCi => "identity_ci",
            Keygen::Simple => "simple",
            Keygen::SimpleCi => "simple_ci",
            Keygen::FullText => "full_text",
            Keygen::Custom(_) => "custom",
        }
    }

    /// Generates index entries for a value
    pub fn generate(&self, value: &Value) -> KeygenOutput {
        match self {
            Keygen::Numeric => match value.score() {
                Some(score) => KeygenOutput::score(score),
                None => KeygenOutput::Nothing,
            },
            Keygen::Boolean => KeygenOutput::score(if truthy(value) { 1.0 } else { 0.0 }),
            Keygen::Identity => KeygenOutput::keys([value.encode()]),
            Keygen::IdentityCi => KeygenOutput::keys([value.encode().to_lowercase()]),
            Keygen::Simple => {
                KeygenOutput::keys(value.encode().split_whitespace().map(str::to_string))
            }
            Keygen::SimpleCi => KeygenOutput::keys(
                value
                    .encode()
                    .to_lowercase()
                    .split_whitespace()
                    .map(str::to_string),
            ),
            Keygen::FullText => {
                let cleaned: String = value
                    .encode()
                    .to_lowercase()
                    .chars()
                    .map(|c| if c.is_alphanumeric() { c } else { ' ' })
                    .collect();
                KeygenOutput::keys(cleaned.split_whitespace().map(str::to_string))
            }
            Keygen::Custom(custom) => custom.call(value),
        }
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Boolean(b) => *b,
        Value::Integer(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::Text(s) => !s.is_empty(),
        Value::Json(j) => !(j.is_null() || j == &serde_json::Value::Bool(false)),
        Value::DateTime(_) | Value::Date(_) | Value::Time(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(output: KeygenOutput) -> Vec<String> {
        match output {
            KeygenOutput::Keys(keys) => keys.into_iter().collect(),
            other => panic!("expected keys, got {:?}", other),
        }
    }

    #[test]
    fn test_numeric() {
        let out = Keygen::Numeric.generate(&Value::Integer(5));
        assert_eq!(out, KeygenOutput::Scores(BTreeMap::from([(String::new(), 5.0)])));
        assert_eq!(Keygen::Numeric.generate(&Value::from("x")), KeygenOutput::Nothing);
    }

    #[test]
    fn test_boolean() {
        let score = |v: Value| match Keygen::Boolean.generate(&v) {
            KeygenOutput::Scores(s) => s[""],
            other => panic!("{:?}", other),
        };
        assert_eq!(score(Value::Boolean(true)), 1.0);
        assert_eq!(score(Value::Integer(0)), 0.0);
        assert_eq!(score(Value::from("")), 0.0);
    }

    #[test]
    fn test_identity() {
        assert_eq!(keys(Keygen::Identity.generate(&Value::from("A@x.com"))), vec!["A@x.com"]);
        assert_eq!(keys(Keygen::IdentityCi.generate(&Value::from("A@x.com"))), vec!["a@x.com"]);
        assert_eq!(Keygen::Identity.generate(&Value::from("")), KeygenOutput::Nothing);
    }

    #[test]
    fn test_word_splitting() {
        let v = Value::from("Hello, World  hello");
        assert_eq!(keys(Keygen::Simple.generate(&v)), vec!["Hello,", "World", "hello"]);
        assert_eq!(keys(Keygen::SimpleCi.generate(&v)), vec!["hello", "hello,", "world"]);
        assert_eq!(keys(Keygen::FullText.generate(&v)), vec!["hello", "world"]);
    }

    #[test]
    fn test_custom() {
        let gen = Keygen::custom_keys(|v| {
            KeygenOutput::Keys(BTreeSet::from([format!("k-{}", v.encode())]))
        });
        assert!(!gen.is_scored());
        assert_eq!(keys(gen.generate(&Value::Integer(3))), vec!["k-3"]);

        let gen = Keygen::custom_scores(|v| {
            KeygenOutput::Scores(BTreeMap::from([("len".to_string(), v.encode().len() as f64)]))
        });
        assert!(gen.is_scored());
        assert_eq!(gen.name(), "custom");
    }

    #[test]
    fn test_serde_names() {
        let gen: Keygen = serde_json::from_str("\"identity_ci\"").unwrap();
        assert!(matches!(gen, Keygen::IdentityCi));
        assert_eq!(serde_json::to_string(&Keygen::FullText).unwrap(), "\"full_text\"");
    }
}
