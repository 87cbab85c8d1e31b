//! Engine facade
//!
//! Wires the schema registry, the store, the configuration and the metrics
//! together. Every public operation of the crate is reachable from here.
//!
//! ```ignore
//! let mut engine = Engine::new(MemoryStore::new(), EngineConfig::default());
//! engine.register(user_schema)?;
//! engine.apply("User", &Change::create("1", attrs))?;
//! let ids = engine.search(&engine.query("User").startswith("email", "al"))?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::executor::{EntityCache, EntityPages, Pages, QueryExecutor};
use crate::index::{IndexDescriptor, IndexRegistry, KeyLayout};
use crate::observability::{log_event, Event, Logger, MetricsRegistry, ObservationScope};
use crate::planner::{ExplainPlan, Query, QueryError, QueryPlan, QueryPlanner};
use crate::schema::{Schema, SchemaRegistry};
use crate::store::Store;
use crate::value::{AttributeMap, Value};
use crate::writer::{AtomicWriter, Change};

/// Indexing and transactional-write engine over a store
pub struct Engine<S: Store> {
    store: S,
    config: EngineConfig,
    schemas: SchemaRegistry,
    metrics: MetricsRegistry,
}

impl<S: Store> Engine<S> {
    /// Engine with no registered schemas
    pub fn new(store: S, config: EngineConfig) -> Self {
        let schemas = SchemaRegistry::new(config.commit_strategy);
        Self {
            store,
            config,
            schemas,
            metrics: MetricsRegistry::new(),
        }
    }

    /// Engine with the configuration's inline schemas and schema directory registered
    pub fn from_config(store: S, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Logger::set_min_severity(config.log_level);

        let inline = config.schemas.clone();
        let schema_dir = config.schema_dir.clone();
        let mut engine = Self::new(store, config);

        for schema in inline {
            engine.register(schema)?;
        }
        if let Some(dir) = schema_dir {
            let loaded = engine.schemas.load_dir(&dir).map_err(|err| {
                log_event(Event::SchemaRejected, &[("reason", &err.to_string())]);
                err
            })?;
            for namespace in &loaded {
                log_event(Event::SchemaRegistered, &[("namespace", namespace.as_str())]);
            }
        }

        let count = engine.schemas.len().to_string();
        log_event(
            Event::ConfigLoaded,
            &[
                ("strategy", engine.config.commit_strategy.as_str()),
                ("schemas", &count),
            ],
        );
        Ok(engine)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    // ==================================================================
    // Schemas
    // ==================================================================

    /// Validates and registers a namespace schema
    pub fn register(&mut self, schema: Schema) -> Result<Arc<Schema>> {
        let namespace = schema.namespace.clone();
        match self.schemas.register(schema) {
            Ok(schema) => {
                log_event(Event::SchemaRegistered, &[("namespace", namespace.as_str())]);
                Ok(schema)
            }
            Err(err) => {
                log_event(
                    Event::SchemaRejected,
                    &[("namespace", namespace.as_str()), ("code", err.code())],
                );
                Err(err.into())
            }
        }
    }

    /// Removes a namespace schema; stored records and indexes are kept
    pub fn unregister(&mut self, namespace: &str) -> Result<Arc<Schema>> {
        let schema = self.schemas.unregister(namespace)?;
        log_event(Event::SchemaUnregistered, &[("namespace", namespace)]);
        Ok(schema)
    }

    pub fn schema(&self, namespace: &str) -> Result<Arc<Schema>> {
        Ok(self.schemas.get(namespace)?)
    }

    pub fn namespaces(&self) -> Vec<String> {
        self.schemas.namespaces().map(str::to_string).collect()
    }

    // ==================================================================
    // Records
    // ==================================================================

    /// Applies a record change atomically, returning the changed attribute count
    pub fn apply(&self, namespace: &str, change: &Change) -> Result<usize> {
        let schema = self.schemas.get(namespace)?;
        let writer = AtomicWriter::new(&self.store, &self.config, &self.metrics);
        Ok(writer.apply(&schema, change)?)
    }

    /// Raw primary hash of a record; empty when the record does not exist
    pub fn load(&self, namespace: &str, id: &str) -> Result<BTreeMap<String, String>> {
        self.schemas.get(namespace)?;
        Ok(self.store.hgetall(&KeyLayout::new(namespace).primary(id))?)
    }

    /// Primary hash decoded with the schema's declared kinds.
    ///
    /// Fields the schema does not declare are skipped.
    pub fn load_values(&self, namespace: &str, id: &str) -> Result<AttributeMap> {
        let schema = self.schemas.get(namespace)?;
        let raw = self.store.hgetall(&KeyLayout::new(namespace).primary(id))?;
        let mut values = AttributeMap::new();
        for (field, encoded) in raw {
            if let Some(attr) = schema.get(&field) {
                values.insert(field, Value::decode(attr.kind, &encoded)?);
            }
        }
        Ok(values)
    }

    /// Stored index descriptor of a record
    pub fn descriptor(&self, namespace: &str, id: &str) -> Result<Option<IndexDescriptor>> {
        self.schemas.get(namespace)?;
        Ok(IndexRegistry::new(namespace).load_descriptor(&self.store, id)?)
    }

    // ==================================================================
    // Queries
    // ==================================================================

    /// Empty query over a namespace
    pub fn query(&self, namespace: &str) -> Query {
        Query::new(namespace)
    }

    /// Compiles a query against its namespace schema
    pub fn plan(&self, query: &Query) -> Result<QueryPlan> {
        let schema = self.schemas.get(&query.namespace)?;
        match QueryPlanner::new(&schema).plan(query) {
            Ok(plan) => {
                log_event(
                    Event::QueryPlanned,
                    &[
                        ("namespace", plan.namespace.as_str()),
                        ("steps", &plan.steps.len().to_string()),
                    ],
                );
                Ok(plan)
            }
            Err(err) => {
                self.metrics.increment_queries_rejected();
                log_event(
                    Event::QueryRejected,
                    &[("namespace", query.namespace.as_str()), ("code", err.code())],
                );
                Err(err.into())
            }
        }
    }

    /// Ordered ids matching the query, window applied
    pub fn search(&self, query: &Query) -> Result<Vec<String>> {
        let plan = self.plan(query)?;
        let scope = ObservationScope::with_fields("QUERY", &[("namespace", plan.namespace.as_str())]);
        match QueryExecutor::new(&self.store).execute(&plan) {
            Ok(result) => {
                self.metrics.increment_queries_executed();
                let returned = result.ids.len().to_string();
                log_event(
                    Event::QueryExecuted,
                    &[
                        ("namespace", plan.namespace.as_str()),
                        ("steps_run", &result.steps_run.to_string()),
                        ("returned", &returned),
                    ],
                );
                scope.complete_with_fields(&[("returned", &returned)]);
                Ok(result.ids)
            }
            Err(err) => {
                scope.fail(err.code());
                Err(err.into())
            }
        }
    }

    /// Number of ids matching the query, window ignored
    pub fn count(&self, query: &Query) -> Result<usize> {
        let plan = self.plan(query)?;
        let count = QueryExecutor::new(&self.store).count(&plan)?;
        self.metrics.increment_queries_executed();
        Ok(count)
    }

    /// First id of the query's window
    pub fn first(&self, query: &Query) -> Result<Option<String>> {
        let offset = query.limit.map_or(0, |(offset, _)| offset);
        Ok(self.search(&query.limit(offset, 1))?.into_iter().next())
    }

    /// Caches the ordered ids under an expiring key and returns the key
    pub fn cached_result(&self, query: &Query, timeout: u64) -> Result<String> {
        let plan = self.plan(query)?;
        let key = QueryExecutor::new(&self.store).cached_result(&plan, timeout)?;
        self.metrics.increment_queries_executed();
        self.metrics.increment_results_cached();
        log_event(
            Event::ResultCached,
            &[("key", key.as_str()), ("timeout", &timeout.to_string())],
        );
        Ok(key)
    }

    /// Caches the result, then walks it in id pages
    pub fn pages(&self, query: &Query, timeout: u64, page_size: Option<usize>) -> Result<Pages<'_>> {
        let page_size = page_size.unwrap_or(self.config.default_page_size);
        if page_size == 0 {
            return Err(QueryError::InvalidPageSize.into());
        }
        let key = self.cached_result(query, timeout)?;
        Ok(Pages::new(&self.store, key, timeout, page_size)?)
    }

    /// Caches the result, then hydrates it page by page through `cache`
    pub fn iter_result<'a, C: EntityCache>(
        &'a self,
        query: &Query,
        timeout: u64,
        page_size: Option<usize>,
        cache: &'a mut C,
    ) -> Result<EntityPages<'a, C>> {
        let pages = self.pages(query, timeout, page_size)?;
        Ok(EntityPages::new(query.namespace.as_str(), pages, cache))
    }

    /// Explains a query; rejections are reported in the plan, not as errors
    pub fn explain(&self, query: &Query) -> ExplainPlan {
        let planned = self
            .schemas
            .get(&query.namespace)
            .map_err(QueryError::from)
            .and_then(|schema| QueryPlanner::new(&schema).plan(query));
        match planned {
            Ok(plan) => ExplainPlan::from_plan(&plan),
            Err(err) => ExplainPlan::from_error(&query.namespace, &err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CommitStrategy;
    use crate::schema::AttributeSpec;
    use crate::store::MemoryStore;
    use crate::value::ValueKind;
    use tempfile::TempDir;

    fn user() -> Schema {
        Schema::new("User")
            .attribute(AttributeSpec::new("email", ValueKind::Text).unique().prefix())
            .attribute(AttributeSpec::new("age", ValueKind::Integer).indexed())
    }

    fn attrs(pairs: &[(&str, Value)]) -> AttributeMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_register_apply_search() {
        let mut engine = Engine::new(MemoryStore::new(), EngineConfig::default());
        engine.register(user()).unwrap();

        let data = attrs(&[("email", "al@x.com".into()), ("age", 30.into())]);
        assert_eq!(engine.apply("User", &Change::create("1", data.clone())).unwrap(), 2);

        assert_eq!(engine.load("User", "1").unwrap()["age"], "30");
        assert_eq!(engine.load_values("User", "1").unwrap(), data);
        assert!(engine.descriptor("User", "1").unwrap().is_some());

        let query = engine.query("User").startswith("email", "al");
        assert_eq!(engine.search(&query).unwrap(), vec!["1"]);
        assert_eq!(engine.first(&query).unwrap().as_deref(), Some("1"));
        assert_eq!(engine.count(&query).unwrap(), 1);
        assert_eq!(engine.metrics().snapshot().writes, 1);
    }

    #[test]
    fn test_unknown_namespace() {
        let engine = Engine::new(MemoryStore::new(), EngineConfig::default());
        let err = engine.apply("Post", &Change::create("1", AttributeMap::new())).unwrap_err();
        assert_eq!(err.code(), "REDEX_SCHEMA_UNKNOWN_NAMESPACE");

        let explain = engine.explain(&Query::new("Post").filter("a", 1));
        assert!(!explain.accepted);
        assert_eq!(explain.rejection_code.as_deref(), Some("REDEX_SCHEMA_UNKNOWN_NAMESPACE"));
    }

    #[test]
    fn test_register_twice_and_unregister() {
        let mut engine = Engine::new(MemoryStore::new(), EngineConfig::default());
        engine.register(user()).unwrap();
        assert_eq!(
            engine.register(user()).unwrap_err().code(),
            "REDEX_SCHEMA_ALREADY_REGISTERED"
        );
        engine.unregister("User").unwrap();
        assert!(engine.namespaces().is_empty());
    }

    #[test]
    fn test_from_config() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("post.json"),
            r#"{"namespace": "Post", "attributes": [{"name": "score", "kind": "float", "indexed": true}]}"#,
        )
        .unwrap();

        let config = EngineConfig {
            commit_strategy: CommitStrategy::Optimistic,
            schema_dir: Some(temp_dir.path().to_path_buf()),
            schemas: vec![user()],
            ..EngineConfig::default()
        };
        let engine = Engine::from_config(MemoryStore::new(), config).unwrap();
        assert_eq!(engine.namespaces(), vec!["Post", "User"]);
    }

    #[test]
    fn test_rejected_query_is_counted() {
        let mut engine = Engine::new(MemoryStore::new(), EngineConfig::default());
        engine.register(user()).unwrap();

        let err = engine.search(&engine.query("User").filter("email", "x")).unwrap_err();
        assert_eq!(err.code(), "REDEX_QUERY_NOT_INDEXED");
        assert_eq!(engine.metrics().snapshot().queries_rejected, 1);
    }
}
