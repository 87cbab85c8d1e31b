//! Scripted commit
//!
//! One `EVAL` checks every unique constraint, writes the record, swaps its
//! index entries and persists the new descriptor. The server runs the script
//! with exclusive access, so no other client observes an intermediate state.
//!
//! Arguments, all JSON except the first two:
//!
//! ```text
//! ARGV[1]  namespace
//! ARGV[2]  id
//! ARGV[3]  {constraint: value}          unique mappings to check and write
//! ARGV[4]  {constraint: value}          unique mappings to drop if still ours
//! ARGV[5]  [field, ...]                 fields removed from the record
//! ARGV[6]  [field, value, ...]          fields written to the record
//! ARGV[7]  ["attr:key", ...]            membership entries
//! ARGV[8]  {"attr[:sub]": score}        range entries
//! ARGV[9]  [[attr, text, score], ...]   prefix entries
//! ARGV[10] [[attr, reversed, score], ...] suffix entries
//! ARGV[11] true | false                 delete
//! ```
//!
//! Reply: the number of index entries written, or the name of the first
//! violated constraint.

use std::collections::{BTreeMap, BTreeSet};

use crate::index::{IndexEntries, IndexRegistry, PrefixCodec};
use crate::store::{Batch, Commands, Script, ScriptReply, StoreError, StoreResult};

use super::mutation::MutationSet;
use super::unique::{UniqueChanges, UniqueConstraintEnforcer};

const ARGC: usize = 11;

pub const WRITER_LUA: &str = r#"
local namespace = ARGV[1]
local id = ARGV[2]
local is_delete = cjson.decode(ARGV[11])

for i, write in ipairs({false, true}) do
    for col, value in pairs(cjson.decode(ARGV[3])) do
        local key = string.format('%s:%s:uidx', namespace, col)
        if write then
            redis.call('HSET', key, value, id)
        else
            local known = redis.call('HGET', key, value)
            if known ~= id and known ~= false then
                return col
            end
        end
    end
end

for col, value in pairs(cjson.decode(ARGV[4])) do
    local key = string.format('%s:%s:uidx', namespace, col)
    if redis.call('HGET', key, value) == id then
        redis.call('HDEL', key, value)
    end
end

local record = string.format('%s:%s', namespace, id)
local deleted = cjson.decode(ARGV[5])
if #deleted > 0 then
    redis.call('HDEL', record, unpack(deleted))
end
local data = cjson.decode(ARGV[6])
if #data > 0 then
    redis.call('HSET', record, unpack(data))
end

local idata = redis.call('HGET', namespace .. '::', id)
if idata then
    idata = cjson.decode(idata)
    for i, key in ipairs(idata[1] or {}) do
        redis.call('SREM', string.format('%s:%s:idx', namespace, key), id)
    end
    for i, key in ipairs(idata[2] or {}) do
        redis.call('ZREM', string.format('%s:%s:idx', namespace, key), id)
    end
    for i, item in ipairs(idata[3] or {}) do
        redis.call('ZREM', string.format('%s:%s:pre', namespace, item[1]),
            string.format('%s\0%s', item[2], id))
    end
    for i, item in ipairs(idata[4] or {}) do
        redis.call('ZREM', string.format('%s:%s:suf', namespace, item[1]),
            string.format('%s\0%s', item[2], id))
    end
end

if is_delete then
    redis.call('DEL', record)
    redis.call('HDEL', namespace .. '::', id)
    return 0
end

local nkeys = {}
for i, key in ipairs(cjson.decode(ARGV[7])) do
    redis.call('SADD', string.format('%s:%s:idx', namespace, key), id)
    nkeys[#nkeys + 1] = key
end

local nscored = {}
for key, score in pairs(cjson.decode(ARGV[8])) do
    redis.call('ZADD', string.format('%s:%s:idx', namespace, key), score, id)
    nscored[#nscored + 1] = key
end

local nprefix = {}
for i, item in ipairs(cjson.decode(ARGV[9])) do
    redis.call('ZADD', string.format('%s:%s:pre', namespace, item[1]), item[3],
        string.format('%s\0%s', item[2], id))
    nprefix[#nprefix + 1] = {item[1], item[2]}
end

local nsuffix = {}
for i, item in ipairs(cjson.decode(ARGV[10])) do
    redis.call('ZADD', string.format('%s:%s:suf', namespace, item[1]), item[3],
        string.format('%s\0%s', item[2], id))
    nsuffix[#nsuffix + 1] = {item[1], item[2]}
end

local total = #nkeys + #nscored + #nprefix + #nsuffix
if total == 0 then
    redis.call('HDEL', namespace .. '::', id)
else
    local function list(t)
        if #t == 0 then return '[]' end
        return cjson.encode(t)
    end
    redis.call('HSET', namespace .. '::', id, '[' .. list(nkeys) .. ',' ..
        list(nscored) .. ',' .. list(nprefix) .. ',' .. list(nsuffix) .. ']')
end
return total
"#;

/// The writer script
pub const WRITER_SCRIPT: Script = Script {
    name: "redex_writer",
    lua: WRITER_LUA,
    native: run_writer,
};

/// Decoded writer arguments
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptArgs {
    pub namespace: String,
    pub id: String,
    pub unique: UniqueChanges,
    pub deleted: Vec<String>,
    pub changed: Vec<(String, String)>,
    pub membership: BTreeSet<String>,
    pub scored: BTreeMap<String, f64>,
    pub prefix: Vec<(String, String)>,
    pub suffix: Vec<(String, String)>,
    pub delete: bool,
}

impl ScriptArgs {
    pub fn from_mutations(set: &MutationSet) -> Self {
        Self {
            namespace: set.namespace.clone(),
            id: set.id.clone(),
            unique: set.unique.clone(),
            deleted: set.deleted.clone(),
            changed: set.changed.clone(),
            membership: set.entries.membership().clone(),
            scored: set.entries.scored().clone(),
            prefix: set.entries.prefix().to_vec(),
            suffix: set.entries.suffix().to_vec(),
            delete: set.delete,
        }
    }

    /// Encodes the arguments as `ARGV`
    pub fn to_argv(&self) -> StoreResult<Vec<String>> {
        let flat: Vec<&str> = self
            .changed
            .iter()
            .flat_map(|(field, value)| [field.as_str(), value.as_str()])
            .collect();

        Ok(vec![
            self.namespace.clone(),
            self.id.clone(),
            encode(&self.unique.insert)?,
            encode(&self.unique.remove)?,
            encode(&self.deleted)?,
            encode(&flat)?,
            encode(&self.membership)?,
            encode(&self.scored)?,
            encode(&scored_texts(&self.prefix))?,
            encode(&scored_texts(&self.suffix))?,
            encode(&self.delete)?,
        ])
    }

    /// Decodes `ARGV`
    pub fn from_argv(argv: &[String]) -> StoreResult<Self> {
        if argv.len() != ARGC {
            return Err(StoreError::script(
                WRITER_SCRIPT.name,
                format!("expected {} arguments, got {}", ARGC, argv.len()),
            ));
        }

        let flat: Vec<String> = decode(&argv[5])?;
        if flat.len() % 2 != 0 {
            return Err(StoreError::script(
                WRITER_SCRIPT.name,
                "field/value list has odd length",
            ));
        }
        let changed = flat
            .chunks(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect();

        let prefix: Vec<(String, String, f64)> = decode(&argv[8])?;
        let suffix: Vec<(String, String, f64)> = decode(&argv[9])?;

        Ok(Self {
            namespace: argv[0].clone(),
            id: argv[1].clone(),
            unique: UniqueChanges {
                insert: decode(&argv[2])?,
                remove: decode(&argv[3])?,
            },
            deleted: decode(&argv[4])?,
            changed,
            membership: decode(&argv[6])?,
            scored: decode(&argv[7])?,
            prefix: prefix.into_iter().map(|(a, t, _)| (a, t)).collect(),
            suffix: suffix.into_iter().map(|(a, t, _)| (a, t)).collect(),
            delete: decode(&argv[10])?,
        })
    }

    fn entries(&self) -> IndexEntries {
        IndexEntries::from_parts(
            self.membership.clone(),
            self.scored.clone(),
            self.prefix.clone(),
            self.suffix.clone(),
        )
    }
}

fn scored_texts(pairs: &[(String, String)]) -> Vec<(&str, &str, f64)> {
    pairs
        .iter()
        .map(|(attr, text)| (attr.as_str(), text.as_str(), PrefixCodec::score(text)))
        .collect()
}

fn encode<T: serde::Serialize + ?Sized>(value: &T) -> StoreResult<String> {
    serde_json::to_string(value).map_err(|e| StoreError::script(WRITER_SCRIPT.name, e))
}

fn decode<T: serde::de::DeserializeOwned>(raw: &str) -> StoreResult<T> {
    serde_json::from_str(raw).map_err(|e| StoreError::script(WRITER_SCRIPT.name, e))
}

fn run_writer(ks: &mut dyn Commands, argv: &[String]) -> StoreResult<ScriptReply> {
    let args = ScriptArgs::from_argv(argv)?;
    let registry = IndexRegistry::new(args.namespace.as_str());
    let keys = registry.keys();

    let conflict = UniqueConstraintEnforcer::check(&args.unique, &args.id, |constraint, value| {
        ks.hget(&keys.unique(constraint), value)
    })?;
    if let Some(conflict) = conflict {
        return Ok(ScriptReply::Text(conflict.constraint));
    }
    for (constraint, value) in &args.unique.insert {
        ks.hset(&keys.unique(constraint), value, &args.id)?;
    }
    let owned = UniqueConstraintEnforcer::owned_removals(&args.unique, &args.id, |constraint, value| {
        ks.hget(&keys.unique(constraint), value)
    })?;
    for (constraint, value) in &owned {
        ks.hdel(&keys.unique(constraint), value)?;
    }

    let primary = keys.primary(&args.id);
    for field in &args.deleted {
        ks.hdel(&primary, field)?;
    }
    for (field, value) in &args.changed {
        ks.hset(&primary, field, value)?;
    }

    let previous = match ks.hget(&keys.descriptor(), &args.id)? {
        Some(raw) => Some(
            registry
                .decode_descriptor(&args.id, &raw)
                .map_err(|e| StoreError::script(WRITER_SCRIPT.name, e))?,
        ),
        None => None,
    };

    let mut batch = Batch::new();
    let written = if args.delete {
        if let Some(previous) = &previous {
            registry.unindex(&mut batch, &args.id, previous);
        }
        batch.del(primary);
        0
    } else {
        let entries = args.entries();
        registry.index(&mut batch, &args.id, &entries, previous.as_ref());
        entries.len()
    };

    for command in batch.commands() {
        command.apply(&mut *ks)?;
    }
    Ok(ScriptReply::Integer(written as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeSpec, Keygen, Schema};
    use crate::store::{MemoryStore, Store};
    use crate::value::{AttributeMap, Value, ValueKind};
    use crate::writer::mutation::Change;

    fn schema() -> Schema {
        Schema::new("User")
            .attribute(
                AttributeSpec::new("email", ValueKind::Text)
                    .unique()
                    .prefix()
                    .suffix()
                    .keygen(Keygen::IdentityCi),
            )
            .attribute(AttributeSpec::new("age", ValueKind::Integer).indexed())
            .attribute(
                AttributeSpec::new("tags", ValueKind::Text)
                    .indexed()
                    .keygen(Keygen::Simple),
            )
    }

    fn attrs(pairs: &[(&str, Value)]) -> AttributeMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn run(store: &MemoryStore, change: &Change) -> ScriptReply {
        let set = MutationSet::compute(&schema(), change).unwrap();
        let argv = ScriptArgs::from_mutations(&set).to_argv().unwrap();
        store.eval(&WRITER_SCRIPT, &argv).unwrap()
    }

    #[test]
    fn test_argv_layout() {
        let change = Change::create(
            "1",
            attrs(&[("email", "Al@x.com".into()), ("age", 30.into())]),
        );
        let set = MutationSet::compute(&schema(), &change).unwrap();
        let args = ScriptArgs::from_mutations(&set);
        let argv = args.to_argv().unwrap();

        assert_eq!(argv.len(), 11);
        assert_eq!(argv[0], "User");
        assert_eq!(argv[2], r#"{"email":"Al@x.com"}"#);
        assert_eq!(argv[5], r#"["email","Al@x.com","age","30"]"#);
        assert_eq!(argv[7], r#"{"age":30.0}"#);
        assert!(argv[8].starts_with(r#"[["email","al@x.com","#));
        assert_eq!(argv[10], "false");
        assert_eq!(ScriptArgs::from_argv(&argv).unwrap(), args);
    }

    /// The Lua body reads each ARGV slot as the value `to_argv` puts there
    #[test]
    fn test_lua_reads_argv_slots_as_written() {
        let mut slots = BTreeSet::new();
        for piece in WRITER_LUA.split("ARGV[").skip(1) {
            let end = piece.find(']').unwrap();
            slots.insert(piece[..end].parse::<usize>().unwrap());
        }
        assert_eq!(slots, (1..=ARGC).collect::<BTreeSet<_>>());

        let reads = [
            (1, "local namespace = ARGV[1]"),
            (2, "local id = ARGV[2]"),
            (3, "for col, value in pairs(cjson.decode(ARGV[3])) do\n        local key = string.format('%s:%s:uidx'"),
            (4, "for col, value in pairs(cjson.decode(ARGV[4])) do\n    local key = string.format('%s:%s:uidx'"),
            (5, "local deleted = cjson.decode(ARGV[5])"),
            (6, "local data = cjson.decode(ARGV[6])"),
            (7, "for i, key in ipairs(cjson.decode(ARGV[7])) do\n    redis.call('SADD'"),
            (8, "for key, score in pairs(cjson.decode(ARGV[8])) do\n    redis.call('ZADD'"),
            (9, "ipairs(cjson.decode(ARGV[9])) do\n    redis.call('ZADD', string.format('%s:%s:pre'"),
            (10, "ipairs(cjson.decode(ARGV[10])) do\n    redis.call('ZADD', string.format('%s:%s:suf'"),
            (11, "local is_delete = cjson.decode(ARGV[11])"),
        ];
        for (slot, read) in reads {
            assert!(WRITER_LUA.contains(read), "ARGV[{}] is not read as {:?}", slot, read);
        }

        let old = attrs(&[
            ("email", "a@x.com".into()),
            ("age", 30.into()),
            ("tags", "old".into()),
        ]);
        let new = attrs(&[("email", "B@x.com".into()), ("age", 31.into())]);
        let set = MutationSet::compute(&schema(), &Change::update("1", old, new)).unwrap();
        let argv = ScriptArgs::from_mutations(&set).to_argv().unwrap();
        assert_eq!(argv.len(), ARGC);

        let map = |raw: &str| decode::<BTreeMap<String, String>>(raw).unwrap();
        let texts = |raw: &str| decode::<Vec<(String, String, f64)>>(raw).unwrap();

        assert_eq!(argv[0], "User");
        assert_eq!(argv[1], "1");
        assert_eq!(map(&argv[2])["email"], "B@x.com");
        assert_eq!(map(&argv[3])["email"], "a@x.com");
        assert_eq!(decode::<Vec<String>>(&argv[4]).unwrap(), vec!["tags"]);
        assert_eq!(
            decode::<Vec<String>>(&argv[5]).unwrap(),
            vec!["email", "B@x.com", "age", "31"]
        );
        assert!(decode::<BTreeSet<String>>(&argv[6]).unwrap().is_empty());
        assert_eq!(decode::<BTreeMap<String, f64>>(&argv[7]).unwrap()["age"], 31.0);
        assert_eq!(
            texts(&argv[8]),
            vec![("email".to_string(), "b@x.com".to_string(), PrefixCodec::score("b@x.com"))]
        );
        assert_eq!(
            texts(&argv[9]),
            vec![("email".to_string(), "moc.x@b".to_string(), PrefixCodec::score("moc.x@b"))]
        );
        assert!(!decode::<bool>(&argv[10]).unwrap());
    }

    #[test]
    fn test_rejects_bad_argv() {
        let err = ScriptArgs::from_argv(&["User".to_string()]).unwrap_err();
        assert_eq!(err.code(), "REDEX_STORE_SCRIPT");
    }

    #[test]
    fn test_write_then_delete() {
        let store = MemoryStore::new();
        let data = attrs(&[
            ("email", "al@x.com".into()),
            ("age", 30.into()),
            ("tags", "red blue".into()),
        ]);
        assert_eq!(run(&store, &Change::create("1", data.clone())), ScriptReply::Integer(5));

        assert_eq!(store.hget("User:1", "age").unwrap().as_deref(), Some("30"));
        assert_eq!(store.hget("User:email:uidx", "al@x.com").unwrap().as_deref(), Some("1"));
        assert!(store.sismember("User:tags:red:idx", "1").unwrap());
        assert_eq!(store.zscore("User:age:idx", "1").unwrap(), Some(30.0));
        assert!(store.hget("User::", "1").unwrap().is_some());

        assert_eq!(run(&store, &Change::delete("1", data)), ScriptReply::Integer(0));
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn test_violation_writes_nothing() {
        let store = MemoryStore::new();
        run(&store, &Change::create("1", attrs(&[("email", "al@x.com".into())])));
        let before = store.keys().unwrap();

        let reply = run(
            &store,
            &Change::create("2", attrs(&[("email", "al@x.com".into()), ("age", 9.into())])),
        );
        assert_eq!(reply, ScriptReply::Text("email".into()));
        assert_eq!(store.keys().unwrap(), before);
    }

    #[test]
    fn test_update_moves_entries() {
        let store = MemoryStore::new();
        let old = attrs(&[("email", "al@x.com".into()), ("tags", "red".into())]);
        run(&store, &Change::create("1", old.clone()));

        let new = attrs(&[("email", "bo@x.com".into()), ("tags", "blue".into())]);
        run(&store, &Change::update("1", old, new));

        assert!(store.hget("User:email:uidx", "al@x.com").unwrap().is_none());
        assert_eq!(store.hget("User:email:uidx", "bo@x.com").unwrap().as_deref(), Some("1"));
        assert!(!store.sismember("User:tags:red:idx", "1").unwrap());
        assert!(store.sismember("User:tags:blue:idx", "1").unwrap());
        assert_eq!(store.zcard("User:email:pre").unwrap(), 1);
    }
}
