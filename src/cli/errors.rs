//! CLI-specific error types
//!
//! All CLI errors end the process with a non-zero exit code.

use std::fmt;
use std::io;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration or schema file rejected
    ConfigError,
    /// I/O error (stdin/stdout)
    IoError,
    /// Query JSON could not be parsed
    InvalidQuery,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "REDEX_CLI_CONFIG_ERROR",
            Self::IoError => "REDEX_CLI_IO_ERROR",
            Self::InvalidQuery => "REDEX_CLI_INVALID_QUERY",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidQuery, msg)
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<crate::Error> for CliError {
    fn from(e: crate::Error) -> Self {
        Self::config_error(format!("{} ({})", e, e.code()))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaError;

    #[test]
    fn test_display_carries_code() {
        let err = CliError::invalid_query("expected value at line 1");
        assert_eq!(err.code_str(), "REDEX_CLI_INVALID_QUERY");
        assert_eq!(
            err.to_string(),
            "REDEX_CLI_INVALID_QUERY: expected value at line 1"
        );
    }

    #[test]
    fn test_engine_errors_are_config_errors() {
        let err = CliError::from(crate::Error::from(SchemaError::UnknownNamespace("Post".into())));
        assert_eq!(err.code(), &CliErrorCode::ConfigError);
        assert!(err.message().contains("REDEX_SCHEMA_UNKNOWN_NAMESPACE"));
    }
}
