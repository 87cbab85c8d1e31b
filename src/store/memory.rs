//! In-process store
//!
//! `MemoryStore` implements the `Store` command subset over a single
//! mutex-guarded key space, so every command, batch and script runs with
//! exclusive access the way a single-threaded server executes them.
//!
//! Semantics kept from the server:
//! - a collection that becomes empty is removed
//! - commands against a key of another type fail with WRONGTYPE
//! - every write bumps the key's version; EXEC compares watched versions
//! - a batch holding a malformed command is refused whole, before EXEC
//! - expiry is lazy: an expired key disappears on next access

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::errors::{StoreError, StoreResult};
use super::traits::{Batch, Command, Commands, Script, ScriptReply, Store, Watch};
use super::zset::{ScoreRange, SortedSet};

#[derive(Debug, Clone)]
enum Data {
    Hash(BTreeMap<String, String>),
    Set(BTreeSet<String>),
    SortedSet(SortedSet),
}

impl Data {
    fn is_empty(&self) -> bool {
        match self {
            Data::Hash(h) => h.is_empty(),
            Data::Set(s) => s.is_empty(),
            Data::SortedSet(z) => z.is_empty(),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    data: Data,
    expires_at: Option<Instant>,
}

/// The key space guarded by the store mutex
#[derive(Debug, Default)]
struct Keyspace {
    entries: HashMap<String, Entry>,
    versions: HashMap<String, u64>,
    clock: u64,
}

impl Keyspace {
    fn touch(&mut self, key: &str) {
        self.clock += 1;
        self.versions.insert(key.to_string(), self.clock);
    }

    fn version(&mut self, key: &str) -> u64 {
        self.evict_if_expired(key);
        self.versions.get(key).copied().unwrap_or(0)
    }

    fn evict_if_expired(&mut self, key: &str) {
        let expired = self
            .entries
            .get(key)
            .and_then(|e| e.expires_at)
            .map_or(false, |at| at <= Instant::now());
        if expired {
            self.entries.remove(key);
            self.touch(key);
        }
    }

    fn get(&mut self, key: &str) -> Option<&Data> {
        self.evict_if_expired(key);
        self.entries.get(key).map(|e| &e.data)
    }

    fn hash(&mut self, key: &str) -> StoreResult<Option<&BTreeMap<String, String>>> {
        match self.get(key) {
            None => Ok(None),
            Some(Data::Hash(h)) => Ok(Some(h)),
            Some(_) => Err(StoreError::wrong_type(key)),
        }
    }

    fn set(&mut self, key: &str) -> StoreResult<Option<&BTreeSet<String>>> {
        match self.get(key) {
            None => Ok(None),
            Some(Data::Set(s)) => Ok(Some(s)),
            Some(_) => Err(StoreError::wrong_type(key)),
        }
    }

    fn zset(&mut self, key: &str) -> StoreResult<Option<&SortedSet>> {
        match self.get(key) {
            None => Ok(None),
            Some(Data::SortedSet(z)) => Ok(Some(z)),
            Some(_) => Err(StoreError::wrong_type(key)),
        }
    }

    /// Runs `f` on the value at `key`, creating it with `empty` when missing.
    /// Removes the key if the value ends up empty and bumps its version when
    /// `f` reports a change.
    fn update<T>(
        &mut self,
        key: &str,
        empty: fn() -> Data,
        f: impl FnOnce(&mut Data) -> StoreResult<(bool, T)>,
    ) -> StoreResult<T> {
        self.evict_if_expired(key);
        let entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
            data: empty(),
            expires_at: None,
        });
        let outcome = f(&mut entry.data);
        let now_empty = entry.data.is_empty();
        if now_empty {
            self.entries.remove(key);
        }
        let (changed, value) = outcome?;
        if changed {
            self.touch(key);
        }
        Ok(value)
    }

    fn remove(&mut self, key: &str) -> bool {
        self.evict_if_expired(key);
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.touch(key);
        }
        removed
    }
}

fn empty_hash() -> Data {
    Data::Hash(BTreeMap::new())
}

fn empty_set() -> Data {
    Data::Set(BTreeSet::new())
}

fn empty_zset() -> Data {
    Data::SortedSet(SortedSet::new())
}

impl Commands for Keyspace {
    fn hget(&mut self, key: &str, field: &str) -> StoreResult<Option<String>> {
        Ok(self.hash(key)?.and_then(|h| h.get(field).cloned()))
    }

    fn hset(&mut self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        self.update(key, empty_hash, |data| match data {
            Data::Hash(h) => {
                h.insert(field.to_string(), value.to_string());
                Ok((true, ()))
            }
            _ => Err(StoreError::wrong_type(key)),
        })
    }

    fn hdel(&mut self, key: &str, field: &str) -> StoreResult<bool> {
        if self.get(key).is_none() {
            return Ok(false);
        }
        self.update(key, empty_hash, |data| match data {
            Data::Hash(h) => {
                let removed = h.remove(field).is_some();
                Ok((removed, removed))
            }
            _ => Err(StoreError::wrong_type(key)),
        })
    }

    fn del(&mut self, key: &str) -> StoreResult<bool> {
        Ok(self.remove(key))
    }

    fn sadd(&mut self, key: &str, member: &str) -> StoreResult<bool> {
        self.update(key, empty_set, |data| match data {
            Data::Set(s) => {
                let added = s.insert(member.to_string());
                Ok((added, added))
            }
            _ => Err(StoreError::wrong_type(key)),
        })
    }

    fn srem(&mut self, key: &str, member: &str) -> StoreResult<bool> {
        if self.get(key).is_none() {
            return Ok(false);
        }
        self.update(key, empty_set, |data| match data {
            Data::Set(s) => {
                let removed = s.remove(member);
                Ok((removed, removed))
            }
            _ => Err(StoreError::wrong_type(key)),
        })
    }

    fn zadd(&mut self, key: &str, score: f64, member: &str) -> StoreResult<bool> {
        if score.is_nan() {
            return Err(StoreError::NotAFloat {
                key: key.to_string(),
            });
        }
        self.update(key, empty_zset, |data| match data {
            Data::SortedSet(z) => {
                let unchanged = z.score(member) == Some(score);
                let added = z.insert(member, score);
                Ok((!unchanged, added))
            }
            _ => Err(StoreError::wrong_type(key)),
        })
    }

    fn zrem(&mut self, key: &str, member: &str) -> StoreResult<bool> {
        if self.get(key).is_none() {
            return Ok(false);
        }
        self.update(key, empty_zset, |data| match data {
            Data::SortedSet(z) => {
                let removed = z.remove(member);
                Ok((removed, removed))
            }
            _ => Err(StoreError::wrong_type(key)),
        })
    }

    fn expire(&mut self, key: &str, seconds: u64) -> StoreResult<bool> {
        self.evict_if_expired(key);
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.expires_at = Some(Instant::now() + Duration::from_secs(seconds));
                self.touch(key);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Mutex-guarded in-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Keyspace>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Keyspace>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    /// Every live key, sorted. Intended for inspection in tests and tooling.
    pub fn keys(&self) -> StoreResult<Vec<String>> {
        let mut ks = self.lock()?;
        let candidates: Vec<String> = ks.entries.keys().cloned().collect();
        let mut live: Vec<String> = candidates
            .into_iter()
            .filter(|k| ks.get(k).is_some())
            .collect();
        live.sort();
        Ok(live)
    }

    /// Whether `member` belongs to the set at `key`
    pub fn sismember(&self, key: &str, member: &str) -> StoreResult<bool> {
        let mut ks = self.lock()?;
        Ok(ks.set(key)?.map_or(false, |s| s.contains(member)))
    }
}

impl Store for MemoryStore {
    fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        self.lock()?.hget(key, field)
    }

    fn hgetall(&self, key: &str) -> StoreResult<BTreeMap<String, String>> {
        Ok(self.lock()?.hash(key)?.cloned().unwrap_or_default())
    }

    fn hset(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        self.lock()?.hset(key, field, value)
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.lock()?.get(key).is_some())
    }

    fn smembers(&self, key: &str) -> StoreResult<BTreeSet<String>> {
        Ok(self.lock()?.set(key)?.cloned().unwrap_or_default())
    }

    fn scard(&self, key: &str) -> StoreResult<usize> {
        Ok(self.lock()?.set(key)?.map_or(0, |s| s.len()))
    }

    fn zrange_by_score(&self, key: &str, range: ScoreRange) -> StoreResult<Vec<(String, f64)>> {
        Ok(self
            .lock()?
            .zset(key)?
            .map(|z| z.range_by_score(range))
            .unwrap_or_default())
    }

    fn zcount(&self, key: &str, range: ScoreRange) -> StoreResult<usize> {
        Ok(self.lock()?.zset(key)?.map_or(0, |z| z.count(range)))
    }

    fn zscore(&self, key: &str, member: &str) -> StoreResult<Option<f64>> {
        Ok(self.lock()?.zset(key)?.and_then(|z| z.score(member)))
    }

    fn zcard(&self, key: &str) -> StoreResult<usize> {
        Ok(self.lock()?.zset(key)?.map_or(0, |z| z.len()))
    }

    fn zrange(&self, key: &str, start: usize, stop: usize) -> StoreResult<Vec<String>> {
        Ok(self
            .lock()?
            .zset(key)?
            .map(|z| z.range_by_rank(start, stop))
            .unwrap_or_default())
    }

    fn expire(&self, key: &str, seconds: u64) -> StoreResult<bool> {
        self.lock()?.expire(key, seconds)
    }

    fn ttl(&self, key: &str) -> StoreResult<Option<Duration>> {
        let mut ks = self.lock()?;
        ks.evict_if_expired(key);
        Ok(ks
            .entries
            .get(key)
            .and_then(|e| e.expires_at)
            .map(|at| at.saturating_duration_since(Instant::now())))
    }

    fn watch(&self, keys: &[String]) -> StoreResult<Watch> {
        let mut ks = self.lock()?;
        let versions = keys.iter().map(|k| (k.clone(), ks.version(k))).collect();
        Ok(Watch::new(versions))
    }

    fn exec(&self, watch: Option<Watch>, batch: Batch) -> StoreResult<bool> {
        // Queue-time check: nothing of the batch runs
        for command in batch.commands() {
            if let Command::ZAdd { key, score, .. } = command {
                if score.is_nan() {
                    return Err(StoreError::NotAFloat { key: key.clone() });
                }
            }
        }
        let mut ks = self.lock()?;
        if let Some(watch) = watch {
            for (key, version) in watch.versions() {
                if ks.version(key) != *version {
                    return Ok(false);
                }
            }
        }
        for command in batch.commands() {
            command.apply(&mut *ks)?;
        }
        Ok(true)
    }

    fn eval(&self, script: &Script, argv: &[String]) -> StoreResult<ScriptReply> {
        let mut ks = self.lock()?;
        (script.native)(&mut *ks, argv)
    }
}
