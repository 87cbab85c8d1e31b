//! Query executor
//!
//! Runs a plan against the store. Execution flow (strict order):
//!
//! 1. Run each filter step, intersecting with the running result
//! 2. Stop early when the running result becomes empty
//! 3. Re-sort by the ordering index, dropping ids without a score there
//! 4. Sort ascending by `(score, id)`, reversed for descending orderings
//! 5. Apply the window

use std::collections::HashMap;

use crate::index::IndexRegistry;
use crate::planner::{PlanStep, QueryError, QueryPlan, QueryResult};
use crate::store::{Batch, ScoreRange, Store};

use super::result::{window, Candidates, ExecutionResult};

/// Executes plans against a store
pub struct QueryExecutor<'a> {
    store: &'a dyn Store,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Runs `plan`, window included
    pub fn execute(&self, plan: &QueryPlan) -> QueryResult<ExecutionResult> {
        let mut result = self.ordered(plan)?;
        if plan.limit.is_some() {
            result.ids = window(result.ids, plan.limit);
            result.limit_applied = true;
        }
        Ok(result)
    }

    /// Number of ids the unwindowed plan yields
    pub fn count(&self, plan: &QueryPlan) -> QueryResult<usize> {
        let registry = IndexRegistry::new(plan.namespace.as_str());
        match (plan.steps.as_slice(), &plan.order) {
            ([PlanStep::Members { attribute, value }], None) => {
                Ok(registry.count_members(self.store, attribute, value)?)
            }
            ([PlanStep::Range { entry, range }], None) => {
                Ok(registry.count_range(self.store, entry, *range)?)
            }
            ([], Some(order)) => Ok(registry.count_range(self.store, &order.entry, ScoreRange::all())?),
            _ => Ok(self.ordered(plan)?.ids.len()),
        }
    }

    /// Stores the ordered ids of the unwindowed plan under an expiring key.
    ///
    /// The key is `<ns>:cache:<fingerprint>`; scores are ranks. Replaces any
    /// previous result under the same key in one batch.
    pub fn cached_result(&self, plan: &QueryPlan, timeout: u64) -> QueryResult<String> {
        if timeout < 1 {
            return Err(QueryError::InvalidTimeout { timeout });
        }
        let ids = self.ordered(plan)?.ids;
        let key = plan.keys().cache(&plan.fingerprint());

        let mut batch = Batch::new();
        batch.del(key.as_str());
        for (rank, id) in ids.iter().enumerate() {
            batch.zadd(key.as_str(), rank as f64, id.as_str());
        }
        batch.expire(key.as_str(), timeout);
        self.store.exec(None, batch)?;
        Ok(key)
    }

    /// Steps 1 to 4; the window is not applied
    fn ordered(&self, plan: &QueryPlan) -> QueryResult<ExecutionResult> {
        let registry = IndexRegistry::new(plan.namespace.as_str());
        let order_entry = plan.order.as_ref().map(|o| o.entry.as_str());

        let mut result = ExecutionResult::default();
        let mut current: Option<Candidates> = None;
        let mut order_scores: Option<HashMap<String, f64>> = None;

        for step in &plan.steps {
            let next = match step {
                PlanStep::Members { attribute, value } => {
                    Candidates::from_set(registry.members(self.store, attribute, value)?)
                }
                PlanStep::Union { attribute, values } => {
                    Candidates::from_set(registry.union(self.store, attribute, values)?)
                }
                PlanStep::Range { entry, range } => {
                    let pairs = registry.range(self.store, entry, *range)?;
                    if order_entry == Some(entry.as_str()) && order_scores.is_none() {
                        order_scores = Some(pairs.iter().cloned().collect());
                    }
                    Candidates::from_range(pairs)
                }
                PlanStep::Prefix { attribute, text } => {
                    Candidates::from_set(registry.prefix_scan(self.store, attribute, text)?)
                }
                PlanStep::Suffix { attribute, text } => {
                    Candidates::from_set(registry.suffix_scan(self.store, attribute, text)?)
                }
                PlanStep::Pattern { attribute, pattern } => {
                    Candidates::from_set(registry.pattern_scan(self.store, attribute, pattern)?)
                }
            };
            result.steps_run += 1;

            let merged = match current.take() {
                Some(current) => current.intersect(next),
                None => next,
            };
            if merged.is_empty() {
                result.short_circuited = result.steps_run < plan.steps.len();
                return Ok(result);
            }
            current = Some(merged);
        }

        let candidates = match (current, &plan.order) {
            (Some(candidates), Some(order)) => {
                let scores = match order_scores {
                    Some(scores) => scores,
                    None => registry.scores(self.store, &order.entry)?,
                };
                candidates.rescore(&scores)
            }
            (Some(candidates), None) => candidates,
            (None, Some(order)) => Candidates::from_range(registry.range(
                self.store,
                &order.entry,
                ScoreRange::all(),
            )?),
            (None, None) => Candidates::default(),
        };

        let descending = plan.order.as_ref().map_or(false, |o| o.descending);
        result.ids = candidates.into_sorted(descending);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexEntries;
    use crate::planner::{Query, QueryPlanner};
    use crate::schema::{AttributeSpec, Schema};
    use crate::store::MemoryStore;
    use crate::value::ValueKind;

    fn schema() -> Schema {
        Schema::new("User")
            .attribute(AttributeSpec::new("name", ValueKind::Text).indexed().prefix())
            .attribute(AttributeSpec::new("age", ValueKind::Integer).indexed())
    }

    fn seed(store: &MemoryStore) {
        let registry = IndexRegistry::new("User");
        for (id, name, age) in [("1", "alice", 30.0), ("2", "alicia", 25.0), ("3", "bob", 41.0)] {
            let mut entries = IndexEntries::new();
            entries.add_membership("name", name);
            entries.add_prefix("name", name);
            entries.add_score("age", "", age);
            let mut batch = Batch::new();
            registry.index(&mut batch, id, &entries, None);
            store.exec(None, batch).unwrap();
        }
    }

    fn plan(query: &Query) -> QueryPlan {
        let schema = schema();
        QueryPlanner::new(&schema).plan(query).unwrap()
    }

    #[test]
    fn test_intersection_and_default_order() {
        let store = MemoryStore::new();
        seed(&store);
        let executor = QueryExecutor::new(&store);

        let result = executor
            .execute(&plan(&Query::new("User").startswith("name", "ali").range("age", None, None)))
            .unwrap();
        assert_eq!(result.ids, vec!["2", "1"]);
        assert_eq!(result.steps_run, 2);
        assert!(!result.limit_applied);
    }

    #[test]
    fn test_short_circuit() {
        let store = MemoryStore::new();
        seed(&store);
        let executor = QueryExecutor::new(&store);

        let result = executor
            .execute(&plan(&Query::new("User").filter("name", "zed").startswith("name", "a")))
            .unwrap();
        assert!(result.ids.is_empty());
        assert_eq!(result.steps_run, 1);
        assert!(result.short_circuited);
    }

    #[test]
    fn test_order_and_window() {
        let store = MemoryStore::new();
        seed(&store);
        let executor = QueryExecutor::new(&store);

        let result = executor.execute(&plan(&Query::new("User").order_by("-age"))).unwrap();
        assert_eq!(result.ids, vec!["3", "1", "2"]);

        let result = executor
            .execute(&plan(&Query::new("User").order_by("-age").limit(1, 1)))
            .unwrap();
        assert_eq!(result.ids, vec!["1"]);
        assert!(result.limit_applied);
    }

    #[test]
    fn test_count_shortcuts() {
        let store = MemoryStore::new();
        seed(&store);
        let executor = QueryExecutor::new(&store);

        assert_eq!(executor.count(&plan(&Query::new("User").filter("name", "bob"))).unwrap(), 1);
        assert_eq!(
            executor
                .count(&plan(&Query::new("User").range("age", Some(26.into()), None)))
                .unwrap(),
            2
        );
        assert_eq!(executor.count(&plan(&Query::new("User").order_by("age"))).unwrap(), 3);
        assert_eq!(
            executor
                .count(&plan(&Query::new("User").startswith("name", "ali").limit(0, 1)))
                .unwrap(),
            2
        );
    }

    #[test]
    fn test_cached_result() {
        let store = MemoryStore::new();
        seed(&store);
        let executor = QueryExecutor::new(&store);
        let plan = plan(&Query::new("User").order_by("age").limit(0, 1));

        let err = executor.cached_result(&plan, 0).unwrap_err();
        assert_eq!(err.code(), "REDEX_QUERY_INVALID_TIMEOUT");

        let key = executor.cached_result(&plan, 30).unwrap();
        assert!(key.starts_with("User:cache:"));
        assert_eq!(store.zrange(&key, 0, 10).unwrap(), vec!["2", "1", "3"]);
        assert!(store.ttl(&key).unwrap().is_some());
    }
}
