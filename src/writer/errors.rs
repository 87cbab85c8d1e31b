//! Write error types
//!
//! Error codes:
//! - REDEX_UNIQUE_VIOLATION (REJECT, recoverable by the caller)
//! - REDEX_CONCURRENCY_CONFLICT (ERROR, retry bound exceeded)
//! - REDEX_WRITE_UNKNOWN_ATTRIBUTE (REJECT)
//! - REDEX_WRITE_MISSING_ID (REJECT)
//! - REDEX_WRITE_NON_FINITE_SCORE (REJECT)
//! - REDEX_VALUE_* / REDEX_INDEX_* / REDEX_STORE_* (propagated)
//!
//! Every error is raised before the commit is applied; the store is never
//! left partially mutated.

use thiserror::Error;

use crate::index::IndexError;
use crate::store::StoreError;
use crate::value::ValueError;

/// Result type for writes
pub type WriteResult<T> = Result<T, WriteError>;

/// Errors raised by the atomic writer
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WriteError {
    /// A unique constraint already maps the value to another record
    #[error("value {value:?} for {namespace}:{attribute}:uidx not distinct")]
    UniquenessViolation {
        namespace: String,
        attribute: String,
        value: String,
    },

    /// Optimistic commit kept losing races
    #[error("commit abandoned after {attempts} attempts lost to concurrent writers")]
    ConcurrencyConflict { attempts: u32 },

    /// Attribute not declared in the namespace schema
    #[error("{namespace} has no attribute {attribute:?}")]
    UnknownAttribute { namespace: String, attribute: String },

    #[error("record id must not be empty")]
    MissingId,

    /// A keygen produced a NaN or infinite index score
    #[error("attribute {attribute:?} scores {score} on {index}, index scores must be finite")]
    NonFiniteScore {
        attribute: String,
        index: String,
        score: f64,
    },

    #[error("attribute {attribute:?}: {source}")]
    Value {
        attribute: String,
        #[source]
        source: ValueError,
    },

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WriteError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            WriteError::UniquenessViolation { .. } => "REDEX_UNIQUE_VIOLATION",
            WriteError::ConcurrencyConflict { .. } => "REDEX_CONCURRENCY_CONFLICT",
            WriteError::UnknownAttribute { .. } => "REDEX_WRITE_UNKNOWN_ATTRIBUTE",
            WriteError::MissingId => "REDEX_WRITE_MISSING_ID",
            WriteError::NonFiniteScore { .. } => "REDEX_WRITE_NON_FINITE_SCORE",
            WriteError::Value { source, .. } => source.code(),
            WriteError::Index(e) => e.code(),
            WriteError::Store(e) => e.code(),
        }
    }

    /// Whether the caller can resolve the error by changing its input
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            WriteError::UniquenessViolation { .. } | WriteError::ConcurrencyConflict { .. }
        )
    }
}
