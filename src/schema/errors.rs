//! Schema error types
//!
//! Every schema error is a configuration error raised at registration or
//! load time, before any record is written.
//!
//! Error codes:
//! - REDEX_SCHEMA_INVALID_NAME (REJECT)
//! - REDEX_SCHEMA_DUPLICATE_ATTRIBUTE (REJECT)
//! - REDEX_SCHEMA_KEYGEN (REJECT)
//! - REDEX_SCHEMA_COMPOSITE (REJECT)
//! - REDEX_SCHEMA_STRATEGY (REJECT)
//! - REDEX_SCHEMA_ALREADY_REGISTERED (REJECT)
//! - REDEX_SCHEMA_UNKNOWN_NAMESPACE (REJECT)
//! - REDEX_SCHEMA_MALFORMED (FATAL)

use thiserror::Error;

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Schema configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Namespace or attribute name is empty or contains ':'
    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("attribute {attribute:?} declared twice in {namespace}")]
    DuplicateAttribute { namespace: String, attribute: String },

    /// Keygen incompatible with the attribute's kind or flags
    #[error("keygen {keygen} cannot be used for {namespace}.{attribute}: {reason}")]
    Keygen {
        namespace: String,
        attribute: String,
        keygen: String,
        reason: String,
    },

    /// Composite unique constraint is malformed
    #[error("composite unique ({columns}) on {namespace} is invalid: {reason}")]
    Composite {
        namespace: String,
        columns: String,
        reason: String,
    },

    /// Schema needs capabilities the configured commit strategy lacks
    #[error("{namespace} cannot use the {strategy} commit strategy: {reason}")]
    Strategy {
        namespace: String,
        strategy: String,
        reason: String,
    },

    #[error("namespace {0} is already registered")]
    AlreadyRegistered(String),

    #[error("namespace {0} is not registered")]
    UnknownNamespace(String),

    /// Schema file unreadable or not valid JSON
    #[error("malformed schema at {path}: {reason}")]
    Malformed { path: String, reason: String },
}

impl SchemaError {
    pub(crate) fn invalid_name(name: &str, reason: impl Into<String>) -> Self {
        SchemaError::InvalidName {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(path: impl Into<String>, reason: impl ToString) -> Self {
        SchemaError::Malformed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::InvalidName { .. } => "REDEX_SCHEMA_INVALID_NAME",
            SchemaError::DuplicateAttribute { .. } => "REDEX_SCHEMA_DUPLICATE_ATTRIBUTE",
            SchemaError::Keygen { .. } => "REDEX_SCHEMA_KEYGEN",
            SchemaError::Composite { .. } => "REDEX_SCHEMA_COMPOSITE",
            SchemaError::Strategy { .. } => "REDEX_SCHEMA_STRATEGY",
            SchemaError::AlreadyRegistered(_) => "REDEX_SCHEMA_ALREADY_REGISTERED",
            SchemaError::UnknownNamespace(_) => "REDEX_SCHEMA_UNKNOWN_NAMESPACE",
            SchemaError::Malformed { .. } => "REDEX_SCHEMA_MALFORMED",
        }
    }

    /// Returns whether the process cannot continue with this configuration
    pub fn is_fatal(&self) -> bool {
        matches!(self, SchemaError::Malformed { .. })
    }
}
