//! Explain output
//!
//! Renders a plan as the ordered store operations it runs, with concrete
//! keys. Deterministic: the fingerprint of cached results is derived from it.

use std::fmt;

use serde::Serialize;

use crate::store::ScoreRange;

use super::errors::QueryError;
use super::planner::{PlanStep, QueryPlan};

/// One store operation of a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExplainStep {
    pub op: &'static str,
    pub key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub detail: String,
}

impl fmt::Display for ExplainStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.op)?;
        if !self.key.is_empty() {
            write!(f, " {}", self.key)?;
        }
        if !self.detail.is_empty() {
            write!(f, " {}", self.detail)?;
        }
        Ok(())
    }
}

/// Explain output for an accepted or rejected query
#[derive(Debug, Clone, Serialize)]
pub struct ExplainPlan {
    pub accepted: bool,
    pub namespace: String,
    pub steps: Vec<ExplainStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_code: Option<String>,
}

impl ExplainPlan {
    pub fn from_plan(plan: &QueryPlan) -> Self {
        let keys = plan.keys();
        let mut steps: Vec<ExplainStep> = plan
            .steps
            .iter()
            .map(|step| match step {
                PlanStep::Members { attribute, value } => ExplainStep {
                    op: "SMEMBERS",
                    key: keys.membership(attribute, value),
                    detail: String::new(),
                },
                PlanStep::Union { attribute, values } => ExplainStep {
                    op: "SUNION",
                    key: values
                        .iter()
                        .map(|value| keys.membership(attribute, value))
                        .collect::<Vec<_>>()
                        .join(" "),
                    detail: String::new(),
                },
                PlanStep::Range { entry, range } => ExplainStep {
                    op: "ZRANGEBYSCORE",
                    key: keys.index(entry),
                    detail: render_range(range),
                },
                PlanStep::Prefix { attribute, text } => ExplainStep {
                    op: "PREFIX_SCAN",
                    key: keys.prefix(attribute),
                    detail: quote(text),
                },
                PlanStep::Suffix { attribute, text } => ExplainStep {
                    op: "SUFFIX_SCAN",
                    key: keys.suffix(attribute),
                    detail: quote(text),
                },
                PlanStep::Pattern { attribute, pattern } => ExplainStep {
                    op: "PATTERN_SCAN",
                    key: keys.prefix(attribute),
                    detail: quote(pattern.as_str()),
                },
            })
            .collect();

        if let Some(order) = &plan.order {
            steps.push(ExplainStep {
                op: "ORDER",
                key: keys.index(&order.entry),
                detail: if order.descending { "desc" } else { "asc" }.to_string(),
            });
        }
        if let Some((offset, count)) = plan.limit {
            steps.push(ExplainStep {
                op: "LIMIT",
                key: String::new(),
                detail: format!("offset={} count={}", offset, count),
            });
        }

        Self {
            accepted: true,
            namespace: plan.namespace.clone(),
            steps,
            rejection_reason: None,
            rejection_code: None,
        }
    }

    pub fn from_error(namespace: &str, err: &QueryError) -> Self {
        Self {
            accepted: false,
            namespace: namespace.to_string(),
            steps: Vec::new(),
            rejection_reason: Some(err.to_string()),
            rejection_code: Some(err.code().to_string()),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.accepted {
            return write!(
                f,
                "REJECTED {} {}",
                self.rejection_code.as_deref().unwrap_or(""),
                self.rejection_reason.as_deref().unwrap_or("")
            );
        }
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}. {}", i + 1, step)?;
        }
        Ok(())
    }
}

fn render_range(range: &ScoreRange) -> String {
    let bound = |b: Option<f64>, open: &str| b.map_or_else(|| open.to_string(), |v| v.to_string());
    format!("[{}, {}]", bound(range.min, "-inf"), bound(range.max, "+inf"))
}

fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_default()
}
