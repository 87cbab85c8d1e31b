//! Schema validation
//!
//! Rules checked once, at registration:
//! - namespace and attribute names are non-empty and contain no ':'
//! - attribute names are unique within the schema
//! - prefix/suffix attributes use a keygen that produces keys
//! - the numeric keygen is only used on numeric kinds
//! - composite constraints name at least two distinct declared attributes,
//!   and no two constraints cover the same columns
//! - the optimistic commit strategy allows at most one unique column and no
//!   composite constraints

use std::collections::HashSet;

use super::errors::{SchemaError, SchemaResult};
use super::keygen::Keygen;
use super::types::Schema;
use crate::config::CommitStrategy;

/// Validates schema structure against a commit strategy
#[derive(Debug, Clone, Copy)]
pub struct SchemaValidator {
    strategy: CommitStrategy,
}

impl SchemaValidator {
    pub fn new(strategy: CommitStrategy) -> Self {
        Self { strategy }
    }

    /// Runs every structural check
    pub fn validate(&self, schema: &Schema) -> SchemaResult<()> {
        check_name(&schema.namespace)?;
        self.validate_attributes(schema)?;
        self.validate_composites(schema)?;
        self.validate_strategy(schema)
    }

    fn validate_attributes(&self, schema: &Schema) -> SchemaResult<()> {
        let mut seen = HashSet::new();
        for attr in &schema.attributes {
            check_name(&attr.name)?;
            if !seen.insert(attr.name.as_str()) {
                return Err(SchemaError::DuplicateAttribute {
                    namespace: schema.namespace.clone(),
                    attribute: attr.name.clone(),
                });
            }

            let keygen = attr.effective_keygen();
            let keygen_error = |reason: &str| SchemaError::Keygen {
                namespace: schema.namespace.clone(),
                attribute: attr.name.clone(),
                keygen: keygen.name().to_string(),
                reason: reason.to_string(),
            };

            if (attr.prefix || attr.suffix) && keygen.is_scored() {
                return Err(keygen_error("prefix/suffix indexes need a keygen producing keys"));
            }
            if matches!(keygen, Keygen::Numeric) && !attr.kind.is_numeric() {
                return Err(keygen_error("numeric keygen needs a numeric kind"));
            }
        }
        Ok(())
    }

    fn validate_composites(&self, schema: &Schema) -> SchemaResult<()> {
        let mut seen: Vec<Vec<&str>> = Vec::new();
        for constraint in &schema.unique_together {
            let composite_error = |reason: String| SchemaError::Composite {
                namespace: schema.namespace.clone(),
                columns: constraint.columns.join(", "),
                reason,
            };

            if constraint.columns.len() < 2 {
                return Err(composite_error("needs at least two columns".into()));
            }

            let mut columns: Vec<&str> = constraint.columns.iter().map(String::as_str).collect();
            for column in &columns {
                if schema.get(column).is_none() {
                    return Err(composite_error(format!("unknown attribute {:?}", column)));
                }
            }
            columns.sort_unstable();
            if columns.windows(2).any(|w| w[0] == w[1]) {
                return Err(composite_error("columns repeat".into()));
            }
            if seen.contains(&columns) {
                return Err(composite_error("declared twice".into()));
            }
            seen.push(columns);
        }
        Ok(())
    }

    fn validate_strategy(&self, schema: &Schema) -> SchemaResult<()> {
        if self.strategy != CommitStrategy::Optimistic {
            return Ok(());
        }
        let strategy_error = |reason: String| SchemaError::Strategy {
            namespace: schema.namespace.clone(),
            strategy: self.strategy.as_str().to_string(),
            reason,
        };

        let unique = schema.unique_columns().count();
        if unique > 1 {
            return Err(strategy_error(format!(
                "{} unique columns, at most one allowed",
                unique
            )));
        }
        if !schema.unique_together.is_empty() {
            return Err(strategy_error("composite unique constraints need scripting".into()));
        }
        Ok(())
    }
}

fn check_name(name: &str) -> SchemaResult<()> {
    if name.is_empty() {
        return Err(SchemaError::invalid_name(name, "empty"));
    }
    if name.contains(':') {
        return Err(SchemaError::invalid_name(name, "contains ':'"));
    }
    Ok(())
}
