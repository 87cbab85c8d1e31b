//! Atomic writer
//!
//! Applies one record change as a single atomic unit through the configured
//! commit strategy, then records metrics and the commit event.

use crate::config::{CommitStrategy, EngineConfig};
use crate::observability::{log_event, Event, MetricsRegistry, ObservationScope};
use crate::schema::Schema;
use crate::store::{ScriptReply, Store};

use super::errors::{WriteError, WriteResult};
use super::mutation::{Change, MutationSet};
use super::optimistic;
use super::script::{ScriptArgs, WRITER_SCRIPT};

/// Writes record changes with their unique mappings and index entries
pub struct AtomicWriter<'a> {
    store: &'a dyn Store,
    config: &'a EngineConfig,
    metrics: &'a MetricsRegistry,
}

impl<'a> AtomicWriter<'a> {
    pub fn new(store: &'a dyn Store, config: &'a EngineConfig, metrics: &'a MetricsRegistry) -> Self {
        Self {
            store,
            config,
            metrics,
        }
    }

    /// Applies `change` and returns the number of attributes written or removed.
    ///
    /// On error nothing has been written.
    pub fn apply(&self, schema: &Schema, change: &Change) -> WriteResult<usize> {
        let scope = ObservationScope::with_fields(
            "WRITE",
            &[
                ("namespace", schema.namespace.as_str()),
                ("id", change.id.as_str()),
                ("strategy", self.config.commit_strategy.as_str()),
            ],
        );

        let result = MutationSet::compute(schema, change).and_then(|set| {
            match self.config.commit_strategy {
                CommitStrategy::Scripted => self.commit_scripted(&set),
                CommitStrategy::Optimistic => {
                    optimistic::commit(self.store, self.config, self.metrics, &set)
                }
            }
            .map(|()| set)
        });

        match result {
            Ok(set) => {
                self.metrics.record_write(set.changes);
                let changes = set.changes.to_string();
                log_event(
                    Event::WriteCommit,
                    &[
                        ("namespace", set.namespace.as_str()),
                        ("id", set.id.as_str()),
                        ("changes", &changes),
                        ("delete", if set.delete { "true" } else { "false" }),
                    ],
                );
                scope.complete_with_fields(&[("changes", &changes)]);
                Ok(set.changes)
            }
            Err(err) => {
                if let WriteError::UniquenessViolation {
                    namespace,
                    attribute,
                    value,
                } = &err
                {
                    self.metrics.increment_unique_violations();
                    log_event(
                        Event::UniqueViolation,
                        &[
                            ("namespace", namespace.as_str()),
                            ("attribute", attribute.as_str()),
                            ("value", value.as_str()),
                        ],
                    );
                }
                scope.fail(err.code());
                Err(err)
            }
        }
    }

    fn commit_scripted(&self, set: &MutationSet) -> WriteResult<()> {
        let argv = ScriptArgs::from_mutations(set).to_argv()?;
        match self.store.eval(&WRITER_SCRIPT, &argv)? {
            ScriptReply::Text(constraint) => Err(WriteError::UniquenessViolation {
                namespace: set.namespace.clone(),
                value: set.unique.insert.get(&constraint).cloned().unwrap_or_default(),
                attribute: constraint,
            }),
            ScriptReply::Integer(_) | ScriptReply::Nil => Ok(()),
        }
    }
}
