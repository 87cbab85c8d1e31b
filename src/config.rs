//! Engine configuration
//!
//! Loaded from a JSON file, immutable after the engine is built:
//!
//! ```json
//! {
//!   "commit_strategy": "optimistic",
//!   "max_retries": 16,
//!   "backoff_base_ms": 2,
//!   "backoff_max_ms": 250,
//!   "default_page_size": 100,
//!   "log_level": "WARN",
//!   "schema_dir": "schemas",
//!   "schemas": [{"namespace": "User", "attributes": []}]
//! }
//! ```
//!
//! Every field is optional. A relative `schema_dir` is resolved against the
//! directory holding the configuration file.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::Severity;
use crate::schema::Schema;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
///
/// Error codes:
/// - REDEX_CONFIG_IO (FATAL)
/// - REDEX_CONFIG_PARSE (FATAL)
/// - REDEX_CONFIG_INVALID (FATAL)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("cannot read configuration {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("cannot parse configuration {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("invalid configuration value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Io { .. } => "REDEX_CONFIG_IO",
            ConfigError::Parse { .. } => "REDEX_CONFIG_PARSE",
            ConfigError::Invalid { .. } => "REDEX_CONFIG_INVALID",
        }
    }
}

/// How record changes reach the store atomically
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitStrategy {
    /// One server-side script per commit
    #[default]
    Scripted,
    /// WATCH + MULTI/EXEC with bounded retries
    Optimistic,
}

impl CommitStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitStrategy::Scripted => "scripted",
            CommitStrategy::Optimistic => "optimistic",
        }
    }
}

impl fmt::Display for CommitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_max_retries() -> u32 {
    16
}

fn default_backoff_base_ms() -> u64 {
    2
}

fn default_backoff_max_ms() -> u64 {
    250
}

fn default_page_size() -> usize {
    100
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub commit_strategy: CommitStrategy,

    /// Optimistic commits retried at most this many times
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// Page size used by paged iteration when none is given
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    #[serde(default)]
    pub log_level: Severity,

    /// Directory of `*.json` schema files registered at startup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_dir: Option<PathBuf>,

    /// Schemas registered at startup
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schemas: Vec<Schema>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            commit_strategy: CommitStrategy::default(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            default_page_size: default_page_size(),
            log_level: Severity::default(),
            schema_dir: None,
            schemas: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Default configuration with the given commit strategy
    pub fn with_strategy(strategy: CommitStrategy) -> Self {
        Self {
            commit_strategy: strategy,
            ..Self::default()
        }
    }

    /// Reads, parses and validates a configuration file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let mut config: EngineConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        if let (Some(dir), Some(base)) = (config.schema_dir.as_ref(), path.parent()) {
            if dir.is_relative() {
                config.schema_dir = Some(base.join(dir));
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges
    pub fn validate(&self) -> ConfigResult<()> {
        if self.default_page_size == 0 {
            return Err(ConfigError::Invalid {
                field: "default_page_size",
                reason: "must be at least 1".into(),
            });
        }
        if self.backoff_base_ms > self.backoff_max_ms {
            return Err(ConfigError::Invalid {
                field: "backoff_base_ms",
                reason: format!(
                    "{} exceeds backoff_max_ms {}",
                    self.backoff_base_ms, self.backoff_max_ms
                ),
            });
        }
        Ok(())
    }

    /// Backoff before retry `attempt` (0-based), without jitter
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let millis = self
            .backoff_base_ms
            .saturating_mul(factor)
            .min(self.backoff_max_ms);
        Duration::from_millis(millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.commit_strategy, CommitStrategy::Scripted);
        assert_eq!(config.max_retries, 16);
        assert_eq!(config.default_page_size, 100);
        assert_eq!(config.log_level, Severity::Warn);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_object_uses_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.backoff_base_ms, 2);
        assert_eq!(config.backoff_max_ms, 250);
    }

    #[test]
    fn test_backoff_is_capped() {
        let config = EngineConfig::default();
        assert_eq!(config.backoff(0), Duration::from_millis(2));
        assert_eq!(config.backoff(3), Duration::from_millis(16));
        assert_eq!(config.backoff(10), Duration::from_millis(250));
        assert_eq!(config.backoff(200), Duration::from_millis(250));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = EngineConfig {
            default_page_size: 0,
            ..EngineConfig::default()
        };
        assert_eq!(config.validate().unwrap_err().code(), "REDEX_CONFIG_INVALID");

        let config = EngineConfig {
            backoff_base_ms: 500,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("redex.json");
        fs::write(
            &path,
            r#"{
                "commit_strategy": "optimistic",
                "max_retries": 3,
                "log_level": "INFO",
                "schema_dir": "schemas",
                "schemas": [{"namespace": "User", "attributes": [{"name": "age", "kind": "integer", "indexed": true}]}]
            }"#,
        )
        .unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.commit_strategy, CommitStrategy::Optimistic);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.log_level, Severity::Info);
        assert_eq!(config.schema_dir, Some(temp_dir.path().join("schemas")));
        assert_eq!(config.schemas[0].namespace, "User");
    }

    #[test]
    fn test_load_errors() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.json");
        assert_eq!(EngineConfig::load(&missing).unwrap_err().code(), "REDEX_CONFIG_IO");

        let path = temp_dir.path().join("bad.json");
        fs::write(&path, r#"{"commit_strategy": "eventual"}"#).unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap_err().code(), "REDEX_CONFIG_PARSE");

        fs::write(&path, r#"{"unknown_field": 1}"#).unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap_err().code(), "REDEX_CONFIG_PARSE");
    }
}
