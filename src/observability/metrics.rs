//! Metrics registry for redex
//!
//! - Counters only (no gauges, no histograms)
//! - Monotonic increase
//! - Reset only when the engine is created
//! - Thread-safe, lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters of one engine
///
/// All counters use Relaxed atomics; values are exact once the counted
/// operations have returned.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Committed writes
    writes: AtomicU64,
    /// Attributes changed across all committed writes
    attributes_changed: AtomicU64,
    /// Writes rejected by unique constraints
    unique_violations: AtomicU64,
    /// Optimistic commits retried after a lost race
    commit_retries: AtomicU64,
    /// Optimistic commits abandoned after the retry bound
    commit_conflicts: AtomicU64,
    /// Successful queries (search, count, cache)
    queries_executed: AtomicU64,
    /// Rejected queries
    queries_rejected: AtomicU64,
    /// Results written to cache keys
    results_cached: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    // Write metrics

    /// Records a committed write
    pub fn record_write(&self, changed: usize) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.attributes_changed
            .fetch_add(changed as u64, Ordering::Relaxed);
    }

    pub fn increment_unique_violations(&self) {
        self.unique_violations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_commit_retries(&self) {
        self.commit_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_commit_conflicts(&self) {
        self.commit_conflicts.fetch_add(1, Ordering::Relaxed);
    }

    // Query metrics

    pub fn increment_queries_executed(&self) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_rejected(&self) {
        self.queries_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_results_cached(&self) {
        self.results_cached.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            writes: self.writes.load(Ordering::Relaxed),
            attributes_changed: self.attributes_changed.load(Ordering::Relaxed),
            unique_violations: self.unique_violations.load(Ordering::Relaxed),
            commit_retries: self.commit_retries.load(Ordering::Relaxed),
            commit_conflicts: self.commit_conflicts.load(Ordering::Relaxed),
            queries_executed: self.queries_executed.load(Ordering::Relaxed),
            queries_rejected: self.queries_rejected.load(Ordering::Relaxed),
            results_cached: self.results_cached.load(Ordering::Relaxed),
        }
    }

    /// Current values as one JSON object
    pub fn to_json(&self) -> String {
        self.snapshot().to_json()
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub writes: u64,
    pub attributes_changed: u64,
    pub unique_violations: u64,
    pub commit_retries: u64,
    pub commit_conflicts: u64,
    pub queries_executed: u64,
    pub queries_rejected: u64,
    pub results_cached: u64,
}

impl MetricsSnapshot {
    pub fn to_json(&self) -> String {
        // Plain integers only; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_values_zero() {
        let metrics = MetricsRegistry::new();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_counters() {
        let metrics = MetricsRegistry::new();
        metrics.record_write(3);
        metrics.record_write(1);
        metrics.increment_commit_retries();
        metrics.increment_queries_executed();
        metrics.increment_queries_rejected();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.writes, 2);
        assert_eq!(snapshot.attributes_changed, 4);
        assert_eq!(snapshot.commit_retries, 1);
        assert_eq!(snapshot.queries_executed, 1);
        assert_eq!(snapshot.queries_rejected, 1);
    }

    #[test]
    fn test_to_json() {
        let metrics = MetricsRegistry::new();
        metrics.increment_unique_violations();

        let parsed: serde_json::Value = serde_json::from_str(&metrics.to_json()).unwrap();
        assert_eq!(parsed["unique_violations"], 1);
        assert_eq!(parsed["writes"], 0);
    }

    #[test]
    fn test_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let metrics = Arc::new(MetricsRegistry::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let m = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..100 {
                        m.increment_queries_executed();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.snapshot().queries_executed, 400);
    }
}
