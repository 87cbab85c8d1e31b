//! Intermediate and final result types

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

/// Ids surviving the filters so far, each with its ordering score
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidates {
    scores: HashMap<String, f64>,
    /// Whether the scores come from a range index
    ranked: bool,
}

impl Candidates {
    /// Ids from a set-like step, all scored 0
    pub fn from_set(ids: BTreeSet<String>) -> Self {
        Self {
            scores: ids.into_iter().map(|id| (id, 0.0)).collect(),
            ranked: false,
        }
    }

    /// `(id, score)` pairs from a range step
    pub fn from_range(pairs: Vec<(String, f64)>) -> Self {
        Self {
            scores: pairs.into_iter().collect(),
            ranked: true,
        }
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.scores.contains_key(id)
    }

    /// AND: keeps ids present in both; the first ranked side supplies scores
    pub fn intersect(self, other: Candidates) -> Candidates {
        let (keep, other_ranked) = (self.ranked, other.ranked);
        let scores = if keep || !other_ranked {
            let mut scores = self.scores;
            scores.retain(|id, _| other.scores.contains_key(id));
            scores
        } else {
            let mut scores = other.scores;
            scores.retain(|id, _| self.scores.contains_key(id));
            scores
        };
        Candidates {
            scores,
            ranked: keep || other_ranked,
        }
    }

    /// Replaces every score with the one in `scores`, dropping ids without one
    pub fn rescore(self, scores: &HashMap<String, f64>) -> Candidates {
        Candidates {
            scores: self
                .scores
                .into_keys()
                .filter_map(|id| scores.get(&id).map(|s| (id, *s)))
                .collect(),
            ranked: true,
        }
    }

    /// Ids ascending by `(score, id)`, or the exact reverse
    pub fn into_sorted(self, descending: bool) -> Vec<String> {
        let mut pairs: Vec<(String, f64)> = self.scores.into_iter().collect();
        pairs.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        if descending {
            pairs.reverse();
        }
        pairs.into_iter().map(|(id, _)| id).collect()
    }
}

/// Result of running a plan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionResult {
    /// Ids in result order, window applied
    pub ids: Vec<String>,
    /// Filter steps actually executed
    pub steps_run: usize,
    /// Whether an empty intermediate result stopped execution early
    pub short_circuited: bool,
    pub limit_applied: bool,
}

/// Applies an `(offset, count)` window
pub fn window(ids: Vec<String>, limit: Option<(usize, usize)>) -> Vec<String> {
    match limit {
        Some((offset, count)) => ids.into_iter().skip(offset).take(count).collect(),
        None => ids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn range(pairs: &[(&str, f64)]) -> Vec<(String, f64)> {
        pairs.iter().map(|(id, s)| (id.to_string(), *s)).collect()
    }

    #[test]
    fn test_intersection_keeps_range_scores() {
        let members = Candidates::from_set(set(&["1", "2", "3"]));
        let ages = Candidates::from_range(range(&[("3", 10.0), ("2", 50.0), ("9", 1.0)]));

        let result = members.intersect(ages);
        assert_eq!(result.len(), 2);
        assert_eq!(result.into_sorted(false), vec!["3", "2"]);
    }

    #[test]
    fn test_first_range_wins() {
        let first = Candidates::from_range(range(&[("1", 5.0), ("2", 1.0)]));
        let second = Candidates::from_range(range(&[("1", 1.0), ("2", 9.0)]));
        assert_eq!(first.intersect(second).into_sorted(false), vec!["2", "1"]);
    }

    #[test]
    fn test_ties_break_by_id() {
        let ids = Candidates::from_set(set(&["b", "c", "a"]));
        assert_eq!(ids.clone().into_sorted(false), vec!["a", "b", "c"]);
        assert_eq!(ids.into_sorted(true), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_rescore_drops_unscored() {
        let ids = Candidates::from_set(set(&["1", "2"]));
        let scores: HashMap<String, f64> = range(&[("2", 3.0)]).into_iter().collect();
        let result = ids.rescore(&scores);
        assert!(!result.contains("1"));
        assert_eq!(result.into_sorted(false), vec!["2"]);
    }

    #[test]
    fn test_window() {
        let ids: Vec<String> = (0..5).map(|i| i.to_string()).collect();
        assert_eq!(window(ids.clone(), Some((1, 2))), vec!["1", "2"]);
        assert_eq!(window(ids.clone(), Some((4, 10))), vec!["4"]);
        assert!(window(ids.clone(), Some((9, 1))).is_empty());
        assert_eq!(window(ids, None).len(), 5);
    }
}
