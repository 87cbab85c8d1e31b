//! Optimistic commit
//!
//! For stores without server-side scripting. Each attempt:
//!
//! 1. WATCHes the record, the descriptor hash and every touched unique hash
//! 2. reads unique owners and the previous descriptor
//! 3. queues every mutation in one MULTI/EXEC batch
//!
//! A lost race restarts from step 1 after an exponential backoff with jitter.
//! After `max_retries` lost races the commit fails with `ConcurrencyConflict`.
//!
//! The descriptor hash `<ns>::` is shared by every record of the namespace,
//! so any commit in the namespace invalidates every other in-flight commit
//! there, not only those on the same record. Writers spread over many records
//! of one namespace therefore retry far more often than their data overlaps,
//! and a hot namespace can exhaust `max_retries`. Watching the record alone
//! is not enough: a commit that changes no attribute writes no primary field
//! yet still rewrites its descriptor entry. Deployments with heavy concurrent
//! writes to one namespace should use the scripted strategy, which takes no
//! watches.

use std::thread;
use std::time::Duration;

use rand::Rng;

use crate::config::EngineConfig;
use crate::index::IndexRegistry;
use crate::observability::{log_event, Event, MetricsRegistry};
use crate::store::{Batch, Store};

use super::errors::{WriteError, WriteResult};
use super::mutation::MutationSet;
use super::unique::UniqueConstraintEnforcer;

/// Commits `set` with WATCH + MULTI/EXEC
pub(crate) fn commit(
    store: &dyn Store,
    config: &EngineConfig,
    metrics: &MetricsRegistry,
    set: &MutationSet,
) -> WriteResult<()> {
    let registry = IndexRegistry::new(set.namespace.as_str());
    let watched = watched_keys(&registry, set);
    let mut attempt = 0u32;

    loop {
        if try_commit(store, &registry, &watched, set)? {
            return Ok(());
        }

        if attempt >= config.max_retries {
            metrics.increment_commit_conflicts();
            let attempts = attempt + 1;
            log_event(
                Event::CommitConflict,
                &[
                    ("namespace", set.namespace.as_str()),
                    ("id", set.id.as_str()),
                    ("attempts", &attempts.to_string()),
                ],
            );
            return Err(WriteError::ConcurrencyConflict { attempts });
        }

        metrics.increment_commit_retries();
        log_event(
            Event::CommitRetry,
            &[
                ("namespace", set.namespace.as_str()),
                ("id", set.id.as_str()),
                ("attempt", &attempt.to_string()),
            ],
        );
        thread::sleep(with_jitter(config.backoff(attempt)));
        attempt += 1;
    }
}

/// The record, the namespace descriptor hash and every touched unique hash
fn watched_keys(registry: &IndexRegistry, set: &MutationSet) -> Vec<String> {
    let keys = registry.keys();
    let mut watched = vec![keys.primary(&set.id), keys.descriptor()];
    watched.extend(
        set.unique
            .constraints()
            .into_iter()
            .map(|constraint| keys.unique(constraint)),
    );
    watched
}

/// One attempt; `Ok(false)` when a watched key changed before EXEC
fn try_commit(
    store: &dyn Store,
    registry: &IndexRegistry,
    watched: &[String],
    set: &MutationSet,
) -> WriteResult<bool> {
    let keys = registry.keys();
    let watch = store.watch(watched)?;

    let lookup = |constraint: &str, value: &str| store.hget(&keys.unique(constraint), value);
    if let Some(conflict) = UniqueConstraintEnforcer::check(&set.unique, &set.id, lookup)? {
        return Err(WriteError::UniquenessViolation {
            namespace: set.namespace.clone(),
            attribute: conflict.constraint,
            value: conflict.value,
        });
    }
    let owned = UniqueConstraintEnforcer::owned_removals(&set.unique, &set.id, lookup)?;
    let previous = registry.load_descriptor(store, &set.id)?;

    let mut batch = Batch::new();
    for (constraint, value) in &set.unique.insert {
        batch.hset(keys.unique(constraint), value, set.id.as_str());
    }
    for (constraint, value) in owned {
        batch.hdel(keys.unique(&constraint), value);
    }

    let primary = keys.primary(&set.id);
    for field in &set.deleted {
        batch.hdel(primary.as_str(), field.as_str());
    }
    for (field, value) in &set.changed {
        batch.hset(primary.as_str(), field.as_str(), value.as_str());
    }

    if set.delete {
        if let Some(previous) = &previous {
            registry.unindex(&mut batch, &set.id, previous);
        }
        batch.del(primary);
    } else {
        registry.index(&mut batch, &set.id, &set.entries, previous.as_ref());
    }

    Ok(store.exec(Some(watch), batch)?)
}

fn with_jitter(delay: Duration) -> Duration {
    let spread = (delay.as_millis() as u64) / 2;
    delay + Duration::from_millis(rand::thread_rng().gen_range(0..=spread))
}
