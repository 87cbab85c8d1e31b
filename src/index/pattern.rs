//! Wildcard patterns for `like` queries
//!
//! | wildcard | matches               |
//! |----------|-----------------------|
//! | `?`      | zero or one character |
//! | `*`      | zero or more          |
//! | `+`      | one or more           |
//! | `!`      | exactly one           |
//!
//! Every other character is literal. Patterns are anchored at the start of
//! the indexed text only; a trailing remainder is allowed.

use regex::Regex;

use super::errors::{IndexError, IndexResult};

const WILDCARDS: [char; 4] = ['?', '*', '+', '!'];

/// A compiled wildcard pattern
#[derive(Debug, Clone)]
pub struct LikePattern {
    raw: String,
    literal_prefix: String,
    regex: Regex,
}

impl LikePattern {
    pub fn compile(pattern: &str) -> IndexResult<Self> {
        let mut source = String::from("(?s)^");
        for ch in pattern.chars() {
            match ch {
                '?' => source.push_str(".?"),
                '*' => source.push_str(".*"),
                '+' => source.push_str(".+"),
                '!' => source.push('.'),
                other => source.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
            }
        }
        let regex = Regex::new(&source).map_err(|e| IndexError::Pattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        let literal_prefix = pattern
            .split(|c| WILDCARDS.contains(&c))
            .next()
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            raw: pattern.to_string(),
            literal_prefix,
            regex,
        })
    }

    /// Pattern text as given
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Literal text before the first wildcard
    pub fn literal_prefix(&self) -> &str {
        &self.literal_prefix
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, text: &str) -> bool {
        LikePattern::compile(pattern).unwrap().is_match(text)
    }

    #[test]
    fn test_wildcards() {
        assert!(matches("a?c", "ac"));
        assert!(matches("a?c", "abc"));
        assert!(!matches("a?c", "abbc"));

        assert!(matches("a*c", "ac"));
        assert!(matches("a*c", "abbbc"));

        assert!(!matches("a+c", "ac"));
        assert!(matches("a+c", "abc"));

        assert!(matches("a!c", "abc"));
        assert!(!matches("a!c", "ac"));
    }

    #[test]
    fn test_anchored_at_start_only() {
        assert!(matches("ali", "alice"));
        assert!(!matches("lic", "alice"));
        assert!(matches("*frank*@", "bigfrank99@x.com"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        assert!(matches("a.b", "a.b"));
        assert!(!matches("a.b", "axb"));
        assert!(matches("(x)[y]", "(x)[y]"));
    }

    #[test]
    fn test_literal_prefix() {
        assert_eq!(LikePattern::compile("ali*ce").unwrap().literal_prefix(), "ali");
        assert_eq!(LikePattern::compile("*frank").unwrap().literal_prefix(), "");
        assert_eq!(LikePattern::compile("plain").unwrap().literal_prefix(), "plain");
    }
}
