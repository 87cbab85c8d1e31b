//! Query planner
//!
//! Validates a query against the namespace schema and compiles every filter
//! into one store-level step. Planning is pure and deterministic: the same
//! schema and query always produce the same plan and the same fingerprint.
//!
//! Capability rules:
//! - Equality / OneOf / Range / ordering need `indexed`
//! - Range and ordering additionally need a scored keygen
//! - Prefix and Pattern need `prefix`, Suffix needs `suffix`

use sha2::{Digest, Sha256};

use crate::index::{scored_entry, KeyLayout, LikePattern};
use crate::schema::{AttributeSpec, Schema};
use crate::store::ScoreRange;
use crate::value::Value;

use super::ast::{Filter, FilterPredicate, Query};
use super::errors::{QueryError, QueryResult};
use super::explain::ExplainPlan;

/// One compiled filter
#[derive(Debug, Clone)]
pub enum PlanStep {
    /// Membership set of one encoded value
    Members { attribute: String, value: String },
    /// Union of membership sets
    Union { attribute: String, values: Vec<String> },
    /// Inclusive score range on a range index
    Range { entry: String, range: ScoreRange },
    Prefix { attribute: String, text: String },
    Suffix { attribute: String, text: String },
    Pattern { attribute: String, pattern: LikePattern },
}

/// Re-sort by a range index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderStep {
    /// Range index entry, `attr` or `attr:sub`
    pub entry: String,
    pub descending: bool,
}

/// Immutable query plan
#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub namespace: String,
    /// Filters in query order, intersected left to right
    pub steps: Vec<PlanStep>,
    pub order: Option<OrderStep>,
    pub limit: Option<(usize, usize)>,
}

impl QueryPlan {
    pub fn keys(&self) -> KeyLayout {
        KeyLayout::new(self.namespace.as_str())
    }

    /// The same plan without its window
    pub fn unlimited(&self) -> Self {
        Self {
            limit: None,
            ..self.clone()
        }
    }

    /// SHA-256 over the rendered steps and ordering; the window is ignored
    pub fn fingerprint(&self) -> String {
        let explain = ExplainPlan::from_plan(&self.unlimited());
        let mut hasher = Sha256::new();
        for step in &explain.steps {
            hasher.update(step.to_string().as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Compiles queries for one namespace
pub struct QueryPlanner<'a> {
    schema: &'a Schema,
}

impl<'a> QueryPlanner<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Plans a query, or rejects it before any store access
    pub fn plan(&self, query: &Query) -> QueryResult<QueryPlan> {
        if query.filters.is_empty() && query.order_by.is_none() {
            return Err(QueryError::Empty {
                namespace: self.schema.namespace.clone(),
            });
        }

        let steps = query
            .filters
            .iter()
            .map(|filter| self.compile(filter))
            .collect::<QueryResult<Vec<_>>>()?;

        let order = match &query.order_by {
            Some(ordering) => {
                let (attr, sub) = self.resolve(&ordering.attribute)?;
                self.require_scored(attr, &ordering.attribute, "order")?;
                Some(OrderStep {
                    entry: scored_entry(&attr.name, sub),
                    descending: ordering.descending,
                })
            }
            None => None,
        };

        Ok(QueryPlan {
            namespace: self.schema.namespace.clone(),
            steps,
            order,
            limit: query.limit,
        })
    }

    /// Splits `attr[:sub]` and looks the attribute up
    fn resolve<'q>(&self, path: &'q str) -> QueryResult<(&'a AttributeSpec, &'q str)> {
        let (name, sub) = path.split_once(':').unwrap_or((path, ""));
        let attr = self
            .schema
            .get(name)
            .ok_or_else(|| QueryError::UnknownAttribute {
                namespace: self.schema.namespace.clone(),
                attribute: path.to_string(),
            })?;
        Ok((attr, sub))
    }

    fn compile(&self, filter: &Filter) -> QueryResult<PlanStep> {
        let path = filter.attribute.as_str();
        let (attr, sub) = self.resolve(path)?;
        let predicate = filter.predicate.name();

        if !sub.is_empty() && !matches!(filter.predicate, FilterPredicate::Range { .. }) {
            return Err(QueryError::invalid_value(
                path,
                format!("sub-index paths only support range filters, not {}", predicate),
            ));
        }

        match &filter.predicate {
            FilterPredicate::Equality(value) => {
                require(attr.indexed, path, predicate, "indexed")?;
                let value = &value.coerce(attr.kind);
                if attr.is_scored() {
                    let score = score_of(path, value)?;
                    Ok(PlanStep::Range {
                        entry: scored_entry(&attr.name, ""),
                        range: ScoreRange::exactly(score),
                    })
                } else {
                    Ok(PlanStep::Members {
                        attribute: attr.name.clone(),
                        value: value.encode(),
                    })
                }
            }
            FilterPredicate::OneOf(values) => {
                require(attr.indexed, path, predicate, "indexed")?;
                if attr.is_scored() {
                    return Err(QueryError::invalid_value(
                        path,
                        "one_of needs a membership index, not a range index",
                    ));
                }
                if values.is_empty() {
                    return Err(QueryError::invalid_value(path, "one_of needs at least one value"));
                }
                Ok(PlanStep::Union {
                    attribute: attr.name.clone(),
                    values: values.iter().map(|v| v.coerce(attr.kind).encode()).collect(),
                })
            }
            FilterPredicate::Range { min, max } => {
                self.require_scored(attr, path, predicate)?;
                let range = ScoreRange {
                    min: min
                        .as_ref()
                        .map(|v| score_of(path, &v.coerce(attr.kind)))
                        .transpose()?,
                    max: max
                        .as_ref()
                        .map(|v| score_of(path, &v.coerce(attr.kind)))
                        .transpose()?,
                };
                Ok(PlanStep::Range {
                    entry: scored_entry(&attr.name, sub),
                    range,
                })
            }
            FilterPredicate::Prefix(text) => {
                require(attr.prefix, path, predicate, "prefix")?;
                Ok(PlanStep::Prefix {
                    attribute: attr.name.clone(),
                    text: text.clone(),
                })
            }
            FilterPredicate::Suffix(text) => {
                require(attr.suffix, path, predicate, "suffix")?;
                Ok(PlanStep::Suffix {
                    attribute: attr.name.clone(),
                    text: text.clone(),
                })
            }
            FilterPredicate::Pattern(raw) => {
                require(attr.prefix, path, predicate, "prefix")?;
                Ok(PlanStep::Pattern {
                    attribute: attr.name.clone(),
                    pattern: LikePattern::compile(raw)?,
                })
            }
        }
    }

    fn require_scored(
        &self,
        attr: &AttributeSpec,
        path: &str,
        predicate: &'static str,
    ) -> QueryResult<()> {
        require(attr.indexed, path, predicate, "indexed")?;
        if attr.is_scored() {
            Ok(())
        } else {
            Err(QueryError::NotScored {
                attribute: path.to_string(),
            })
        }
    }
}

fn require(
    present: bool,
    attribute: &str,
    predicate: &'static str,
    capability: &'static str,
) -> QueryResult<()> {
    if present {
        Ok(())
    } else {
        Err(QueryError::NotIndexed {
            attribute: attribute.to_string(),
            predicate,
            capability,
        })
    }
}

fn score_of(attribute: &str, value: &Value) -> QueryResult<f64> {
    value.score().ok_or_else(|| {
        QueryError::invalid_value(attribute, format!("{} value has no numeric score", value.kind()))
    })
}
