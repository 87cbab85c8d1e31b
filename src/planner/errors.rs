//! Query error types
//!
//! Error codes:
//! - REDEX_QUERY_EMPTY (REJECT)
//! - REDEX_QUERY_UNKNOWN_ATTRIBUTE (REJECT)
//! - REDEX_QUERY_NOT_INDEXED (REJECT)
//! - REDEX_QUERY_NOT_SCORED (REJECT)
//! - REDEX_QUERY_INVALID_VALUE (REJECT)
//! - REDEX_QUERY_INVALID_TIMEOUT (REJECT)
//! - REDEX_QUERY_INVALID_PAGE_SIZE (REJECT)
//! - REDEX_INDEX_* / REDEX_SCHEMA_* / REDEX_STORE_* (propagated)
//!
//! Construction errors are raised while planning, before any store access,
//! and are never retried.

use thiserror::Error;

use crate::index::IndexError;
use crate::schema::SchemaError;
use crate::store::StoreError;

/// Result type for planning and execution
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors raised while building or running a query
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("query on {namespace} has neither filters nor an ordering")]
    Empty { namespace: String },

    #[error("{namespace} has no attribute {attribute:?}")]
    UnknownAttribute { namespace: String, attribute: String },

    /// The attribute lacks the index the predicate needs
    #[error("{predicate} filter on {attribute:?} requires a {capability} index")]
    NotIndexed {
        attribute: String,
        predicate: &'static str,
        capability: &'static str,
    },

    #[error("{attribute:?} has no numeric range index")]
    NotScored { attribute: String },

    #[error("invalid value for {attribute:?}: {reason}")]
    InvalidValue { attribute: String, reason: String },

    #[error("cache timeout must be at least 1 second, got {timeout}")]
    InvalidTimeout { timeout: u64 },

    #[error("page size must be at least 1")]
    InvalidPageSize,

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl QueryError {
    pub(crate) fn invalid_value(attribute: &str, reason: impl Into<String>) -> Self {
        QueryError::InvalidValue {
            attribute: attribute.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::Empty { .. } => "REDEX_QUERY_EMPTY",
            QueryError::UnknownAttribute { .. } => "REDEX_QUERY_UNKNOWN_ATTRIBUTE",
            QueryError::NotIndexed { .. } => "REDEX_QUERY_NOT_INDEXED",
            QueryError::NotScored { .. } => "REDEX_QUERY_NOT_SCORED",
            QueryError::InvalidValue { .. } => "REDEX_QUERY_INVALID_VALUE",
            QueryError::InvalidTimeout { .. } => "REDEX_QUERY_INVALID_TIMEOUT",
            QueryError::InvalidPageSize => "REDEX_QUERY_INVALID_PAGE_SIZE",
            QueryError::Index(e) => e.code(),
            QueryError::Schema(e) => e.code(),
            QueryError::Store(e) => e.code(),
        }
    }

    /// Whether the query itself is malformed
    pub fn is_construction(&self) -> bool {
        !matches!(self, QueryError::Store(_) | QueryError::Schema(_))
            && !matches!(self, QueryError::Index(IndexError::Store(_) | IndexError::Descriptor { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_classification() {
        let err = QueryError::NotIndexed {
            attribute: "bio".into(),
            predicate: "prefix",
            capability: "prefix",
        };
        assert_eq!(err.code(), "REDEX_QUERY_NOT_INDEXED");
        assert!(err.is_construction());
        assert_eq!(err.to_string(), r#"prefix filter on "bio" requires a prefix index"#);

        let err = QueryError::from(StoreError::Backend("down".into()));
        assert_eq!(err.code(), "REDEX_STORE_BACKEND");
        assert!(!err.is_construction());

        let err = QueryError::InvalidTimeout { timeout: 0 };
        assert_eq!(err.code(), "REDEX_QUERY_INVALID_TIMEOUT");
    }
}
