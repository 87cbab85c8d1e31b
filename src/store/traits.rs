//! Store abstraction
//!
//! The engine speaks a small subset of the Redis command set. `Store` is the
//! connection-level interface (every call is one round trip); `Commands` is
//! the key-space interface a server-side script or a queued transaction runs
//! against while the server holds exclusive access.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use super::errors::StoreResult;
use super::zset::ScoreRange;

/// Key-space mutations available inside an atomic unit
pub trait Commands {
    fn hget(&mut self, key: &str, field: &str) -> StoreResult<Option<String>>;
    fn hset(&mut self, key: &str, field: &str, value: &str) -> StoreResult<()>;
    fn hdel(&mut self, key: &str, field: &str) -> StoreResult<bool>;
    fn del(&mut self, key: &str) -> StoreResult<bool>;
    fn sadd(&mut self, key: &str, member: &str) -> StoreResult<bool>;
    fn srem(&mut self, key: &str, member: &str) -> StoreResult<bool>;
    fn zadd(&mut self, key: &str, score: f64, member: &str) -> StoreResult<bool>;
    fn zrem(&mut self, key: &str, member: &str) -> StoreResult<bool>;
    fn expire(&mut self, key: &str, seconds: u64) -> StoreResult<bool>;
}

/// One queued command of a MULTI/EXEC batch
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    HSet { key: String, field: String, value: String },
    HDel { key: String, field: String },
    Del { key: String },
    SAdd { key: String, member: String },
    SRem { key: String, member: String },
    ZAdd { key: String, score: f64, member: String },
    ZRem { key: String, member: String },
    Expire { key: String, seconds: u64 },
}

impl Command {
    /// Runs the command against a key space
    pub fn apply(&self, ks: &mut dyn Commands) -> StoreResult<()> {
        match self {
            Command::HSet { key, field, value } => ks.hset(key, field, value),
            Command::HDel { key, field } => ks.hdel(key, field).map(|_| ()),
            Command::Del { key } => ks.del(key).map(|_| ()),
            Command::SAdd { key, member } => ks.sadd(key, member).map(|_| ()),
            Command::SRem { key, member } => ks.srem(key, member).map(|_| ()),
            Command::ZAdd { key, score, member } => ks.zadd(key, *score, member).map(|_| ()),
            Command::ZRem { key, member } => ks.zrem(key, member).map(|_| ()),
            Command::Expire { key, seconds } => ks.expire(key, *seconds).map(|_| ()),
        }
    }
}

/// Ordered list of commands submitted as one transaction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    commands: Vec<Command>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn hset(&mut self, key: impl Into<String>, field: impl Into<String>, value: impl Into<String>) {
        self.push(Command::HSet {
            key: key.into(),
            field: field.into(),
            value: value.into(),
        });
    }

    pub fn hdel(&mut self, key: impl Into<String>, field: impl Into<String>) {
        self.push(Command::HDel {
            key: key.into(),
            field: field.into(),
        });
    }

    pub fn del(&mut self, key: impl Into<String>) {
        self.push(Command::Del { key: key.into() });
    }

    pub fn sadd(&mut self, key: impl Into<String>, member: impl Into<String>) {
        self.push(Command::SAdd {
            key: key.into(),
            member: member.into(),
        });
    }

    pub fn srem(&mut self, key: impl Into<String>, member: impl Into<String>) {
        self.push(Command::SRem {
            key: key.into(),
            member: member.into(),
        });
    }

    pub fn zadd(&mut self, key: impl Into<String>, score: f64, member: impl Into<String>) {
        self.push(Command::ZAdd {
            key: key.into(),
            score,
            member: member.into(),
        });
    }

    pub fn zrem(&mut self, key: impl Into<String>, member: impl Into<String>) {
        self.push(Command::ZRem {
            key: key.into(),
            member: member.into(),
        });
    }

    pub fn expire(&mut self, key: impl Into<String>, seconds: u64) {
        self.push(Command::Expire {
            key: key.into(),
            seconds,
        });
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Versions of watched keys captured by `Store::watch`
///
/// EXEC succeeds only if no watched key changed since the watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watch {
    versions: Vec<(String, u64)>,
}

impl Watch {
    pub fn new(versions: Vec<(String, u64)>) -> Self {
        Self { versions }
    }

    pub fn versions(&self) -> &[(String, u64)] {
        &self.versions
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.versions.iter().map(|(k, _)| k.as_str())
    }
}

/// Reply of a script invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptReply {
    Integer(i64),
    Text(String),
    Nil,
}

/// Native body of a script, run with exclusive access to the key space
pub type NativeScript = fn(&mut dyn Commands, &[String]) -> StoreResult<ScriptReply>;

/// A server-side script.
///
/// `lua` is the source submitted to Redis-compatible servers; `native` is the
/// equivalent routine for backends that execute scripts in process.
#[derive(Clone, Copy)]
pub struct Script {
    pub name: &'static str,
    pub lua: &'static str,
    pub native: NativeScript,
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Script").field("name", &self.name).finish()
    }
}

/// Connection to a Redis-compatible store
pub trait Store: Send + Sync {
    fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>>;
    fn hgetall(&self, key: &str) -> StoreResult<BTreeMap<String, String>>;
    fn hset(&self, key: &str, field: &str, value: &str) -> StoreResult<()>;
    fn exists(&self, key: &str) -> StoreResult<bool>;
    fn smembers(&self, key: &str) -> StoreResult<BTreeSet<String>>;
    fn scard(&self, key: &str) -> StoreResult<usize>;
    fn zrange_by_score(&self, key: &str, range: ScoreRange) -> StoreResult<Vec<(String, f64)>>;
    fn zcount(&self, key: &str, range: ScoreRange) -> StoreResult<usize>;
    fn zscore(&self, key: &str, member: &str) -> StoreResult<Option<f64>>;
    fn zcard(&self, key: &str) -> StoreResult<usize>;
    /// Members by rank, `start..=stop` inclusive
    fn zrange(&self, key: &str, start: usize, stop: usize) -> StoreResult<Vec<String>>;
    fn expire(&self, key: &str, seconds: u64) -> StoreResult<bool>;
    fn ttl(&self, key: &str) -> StoreResult<Option<Duration>>;

    /// WATCH: snapshot the versions of `keys`
    fn watch(&self, keys: &[String]) -> StoreResult<Watch>;

    /// MULTI/EXEC: apply `batch` atomically.
    ///
    /// Returns `Ok(false)` without applying anything when a watched key changed.
    fn exec(&self, watch: Option<Watch>, batch: Batch) -> StoreResult<bool>;

    /// EVAL: run a script atomically
    fn eval(&self, script: &Script, argv: &[String]) -> StoreResult<ScriptReply>;
}
