//! CLI command implementations
//!
//! Both commands build an engine over an in-memory store: they only touch
//! configuration and schemas, never stored records.

use std::path::Path;

use serde_json::json;

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::planner::{ExplainPlan, Query};
use crate::store::MemoryStore;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_query, write_response, write_text};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Validate { config } => {
            let report = validate(&config)?;
            write_response(report)
        }
        Command::Explain {
            config,
            namespace,
            query,
            json,
        } => {
            let raw = match query {
                Some(raw) => raw,
                None => read_query()?,
            };
            let plan = explain(&config, namespace.as_deref(), &raw)?;
            if json {
                write_text(&plan.to_json())?;
            } else {
                write_text(&plan.to_string())?;
            }
            if plan.accepted {
                Ok(())
            } else {
                Err(CliError::invalid_query(
                    plan.rejection_reason.unwrap_or_default(),
                ))
            }
        }
    }
}

fn boot(config_path: &Path) -> CliResult<Engine<MemoryStore>> {
    let config = EngineConfig::load(config_path).map_err(|e| CliError::config_error(e.to_string()))?;
    Ok(Engine::from_config(MemoryStore::new(), config)?)
}

/// Loads the configuration, registers its schemas and reports what was loaded
pub fn validate(config_path: &Path) -> CliResult<serde_json::Value> {
    let engine = boot(config_path)?;
    Ok(json!({
        "commit_strategy": engine.config().commit_strategy.as_str(),
        "namespaces": engine.namespaces(),
    }))
}

/// Parses a JSON query, replacing its namespace when one is given
pub fn parse_query(raw: &str, namespace: Option<&str>) -> CliResult<Query> {
    let mut value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| CliError::invalid_query(e.to_string()))?;
    if let (Some(namespace), Some(object)) = (namespace, value.as_object_mut()) {
        object.insert("namespace".to_string(), json!(namespace));
    }
    serde_json::from_value(value).map_err(|e| CliError::invalid_query(e.to_string()))
}

/// Compiles a JSON query against the configured schemas
pub fn explain(config_path: &Path, namespace: Option<&str>, raw: &str) -> CliResult<ExplainPlan> {
    let engine = boot(config_path)?;
    let query = parse_query(raw, namespace)?;
    Ok(engine.explain(&query))
}
