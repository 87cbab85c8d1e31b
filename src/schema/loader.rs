//! Schema registry and file loader
//!
//! The registry is an explicit value owned by the engine. Schemas enter it
//! through `register` (validated once) and leave through `unregister`.
//! Schema files are JSON documents, one schema per file; `load_dir` registers
//! every `*.json` file of a directory in file-name order.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::errors::{SchemaError, SchemaResult};
use super::types::Schema;
use super::validator::SchemaValidator;
use crate::config::CommitStrategy;

/// Registered schemas, keyed by namespace
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    validator: SchemaValidator,
    schemas: BTreeMap<String, Arc<Schema>>,
}

impl SchemaRegistry {
    pub fn new(strategy: CommitStrategy) -> Self {
        Self {
            validator: SchemaValidator::new(strategy),
            schemas: BTreeMap::new(),
        }
    }

    /// Validates and registers a schema. Namespaces are registered once.
    pub fn register(&mut self, schema: Schema) -> SchemaResult<Arc<Schema>> {
        self.validator.validate(&schema)?;
        if self.schemas.contains_key(&schema.namespace) {
            return Err(SchemaError::AlreadyRegistered(schema.namespace));
        }
        let schema = Arc::new(schema);
        self.schemas
            .insert(schema.namespace.clone(), Arc::clone(&schema));
        Ok(schema)
    }

    /// Removes a namespace's schema. Stored data is left untouched.
    pub fn unregister(&mut self, namespace: &str) -> SchemaResult<Arc<Schema>> {
        self.schemas
            .remove(namespace)
            .ok_or_else(|| SchemaError::UnknownNamespace(namespace.to_string()))
    }

    pub fn get(&self, namespace: &str) -> SchemaResult<Arc<Schema>> {
        self.schemas
            .get(namespace)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownNamespace(namespace.to_string()))
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.schemas.contains_key(namespace)
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Reads one schema file without registering it
    pub fn read_file(path: &Path) -> SchemaResult<Schema> {
        let content = fs::read_to_string(path).map_err(|e| {
            SchemaError::malformed(
                path.display().to_string(),
                format!("failed to read file: {}", e),
            )
        })?;
        serde_json::from_str(&content).map_err(|e| {
            SchemaError::malformed(path.display().to_string(), format!("invalid JSON: {}", e))
        })
    }

    /// Registers the schema stored in a file
    pub fn load_file(&mut self, path: &Path) -> SchemaResult<Arc<Schema>> {
        let schema = Self::read_file(path)?;
        self.register(schema)
    }

    /// Registers every `*.json` schema file in `dir`, returning the namespaces
    pub fn load_dir(&mut self, dir: &Path) -> SchemaResult<Vec<String>> {
        let entries = fs::read_dir(dir).map_err(|e| {
            SchemaError::malformed(
                dir.display().to_string(),
                format!("failed to read schema directory: {}", e),
            )
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                SchemaError::malformed(
                    dir.display().to_string(),
                    format!("failed to read directory entry: {}", e),
                )
            })?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut loaded = Vec::with_capacity(paths.len());
        for path in paths {
            loaded.push(self.load_file(&path)?.namespace.clone());
        }
        Ok(loaded)
    }
}
