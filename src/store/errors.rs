//! Store error types
//!
//! Error codes:
//! - REDEX_STORE_WRONG_TYPE (REJECT)
//! - REDEX_STORE_NOT_A_FLOAT (REJECT)
//! - REDEX_STORE_SCRIPT (REJECT)
//! - REDEX_STORE_BACKEND (ERROR)

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors reported by a store backend
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// Operation against a key holding the wrong kind of value
    #[error("WRONGTYPE operation against key {key:?} holding the wrong kind of value")]
    WrongType { key: String },

    /// Sorted-set score is not a number
    #[error("score for {key:?} is not a valid float")]
    NotAFloat { key: String },

    /// Script rejected its arguments or failed while running
    #[error("script {name} failed: {reason}")]
    Script { name: String, reason: String },

    /// Transport or server failure reported by a backend
    #[error("store backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub(crate) fn wrong_type(key: &str) -> Self {
        StoreError::WrongType {
            key: key.to_string(),
        }
    }

    pub(crate) fn script(name: &str, reason: impl ToString) -> Self {
        StoreError::Script {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::WrongType { .. } => "REDEX_STORE_WRONG_TYPE",
            StoreError::NotAFloat { .. } => "REDEX_STORE_NOT_A_FLOAT",
            StoreError::Script { .. } => "REDEX_STORE_SCRIPT",
            StoreError::Backend(_) => "REDEX_STORE_BACKEND",
        }
    }
}
