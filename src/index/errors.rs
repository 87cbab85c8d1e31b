//! Index error types
//!
//! Error codes:
//! - REDEX_INDEX_DESCRIPTOR (ERROR)
//! - REDEX_INDEX_PATTERN (REJECT)
//! - REDEX_STORE_* (propagated from the store)

use thiserror::Error;

use crate::store::StoreError;

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Errors raised while reading or maintaining index structures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndexError {
    /// Stored descriptor cannot be decoded
    #[error("descriptor of {namespace}:{id} is malformed: {reason}")]
    Descriptor {
        namespace: String,
        id: String,
        reason: String,
    },

    /// Wildcard pattern does not compile
    #[error("invalid pattern {pattern:?}: {reason}")]
    Pattern { pattern: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IndexError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            IndexError::Descriptor { .. } => "REDEX_INDEX_DESCRIPTOR",
            IndexError::Pattern { .. } => "REDEX_INDEX_PATTERN",
            IndexError::Store(e) => e.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_codes_pass_through() {
        let err = IndexError::from(StoreError::wrong_type("k"));
        assert_eq!(err.code(), "REDEX_STORE_WRONG_TYPE");
        assert!(err.to_string().contains("WRONGTYPE"));
    }
}
