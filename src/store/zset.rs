//! Sorted-set structure used by the in-memory store
//!
//! Members are ordered by `(score, member)`, exactly like a Redis ZSET, using a
//! BTreeSet keyed on a total-order encoding of the score.

use std::collections::{BTreeSet, HashMap};
use std::ops::Bound;

/// Total-order key for an `f64` score.
///
/// Negative values flip all bits, positive values flip the sign bit, so the
/// unsigned ordering of the key equals the numeric ordering of the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScoreKey(u64);

impl ScoreKey {
    /// Creates a key from a score. `-0.0` is folded into `0.0`.
    pub fn from_score(score: f64) -> Self {
        let score = if score == 0.0 { 0.0 } else { score };
        let bits = score.to_bits();
        let ordered = if (bits >> 63) == 1 {
            !bits
        } else {
            bits ^ (1 << 63)
        };
        ScoreKey(ordered)
    }

    /// Recovers the score
    pub fn score(self) -> f64 {
        let bits = if (self.0 >> 63) == 1 {
            self.0 ^ (1 << 63)
        } else {
            !self.0
        };
        f64::from_bits(bits)
    }
}

/// Inclusive score range; `None` is an open bound
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ScoreRange {
    /// Range covering every score
    pub fn all() -> Self {
        Self::default()
    }

    /// Inclusive `[min, max]`
    pub fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Range holding exactly one score
    pub fn exactly(score: f64) -> Self {
        Self::between(score, score)
    }

    /// Checks whether a score lies inside the range
    pub fn contains(&self, score: f64) -> bool {
        self.min.map_or(true, |min| score >= min) && self.max.map_or(true, |max| score <= max)
    }
}

/// A Redis-style sorted set
#[derive(Debug, Clone, Default)]
pub struct SortedSet {
    scores: HashMap<String, f64>,
    ordered: BTreeSet<(ScoreKey, String)>,
}

impl SortedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or re-scores a member. Returns true if the member is new.
    pub fn insert(&mut self, member: &str, score: f64) -> bool {
        let previous = self.scores.insert(member.to_string(), score);
        if let Some(old) = previous {
            self.ordered
                .remove(&(ScoreKey::from_score(old), member.to_string()));
        }
        self.ordered
            .insert((ScoreKey::from_score(score), member.to_string()));
        previous.is_none()
    }

    /// Removes a member. Returns true if it was present.
    pub fn remove(&mut self, member: &str) -> bool {
        match self.scores.remove(member) {
            Some(score) => {
                self.ordered
                    .remove(&(ScoreKey::from_score(score), member.to_string()));
                true
            }
            None => false,
        }
    }

    pub fn score(&self, member: &str) -> Option<f64> {
        self.scores.get(member).copied()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Members with scores inside `range`, in `(score, member)` order
    pub fn range_by_score(&self, range: ScoreRange) -> Vec<(String, f64)> {
        let lower = match range.min {
            Some(min) => Bound::Included((ScoreKey::from_score(min), String::new())),
            None => Bound::Unbounded,
        };
        self.ordered
            .range((lower, Bound::Unbounded))
            .map(|(key, member)| (member.clone(), key.score()))
            .take_while(|(_, score)| range.max.map_or(true, |max| *score <= max))
            .collect()
    }

    /// Number of members with scores inside `range`
    pub fn count(&self, range: ScoreRange) -> usize {
        self.scores.values().filter(|s| range.contains(**s)).count()
    }

    /// Members by rank, `start..=stop`, clamped to the set size
    pub fn range_by_rank(&self, start: usize, stop: usize) -> Vec<String> {
        if start > stop {
            return Vec::new();
        }
        self.ordered
            .iter()
            .skip(start)
            .take(stop - start + 1)
            .map(|(_, member)| member.clone())
            .collect()
    }
}
