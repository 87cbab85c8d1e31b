//! Value codec errors
//!
//! Error codes:
//! - REDEX_VALUE_DECODE (REJECT)
//! - REDEX_VALUE_KIND_MISMATCH (REJECT)

use thiserror::Error;

use super::types::ValueKind;

/// Result type for value encoding/decoding
pub type ValueResult<T> = Result<T, ValueError>;

/// Errors raised while turning stored strings back into typed values
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    /// Stored string cannot be decoded as the declared kind
    #[error("cannot decode {raw:?} as {kind}: {reason}")]
    Decode {
        kind: ValueKind,
        raw: String,
        reason: String,
    },

    /// Value kind differs from the declared attribute kind
    #[error("expected a {expected} value, got {actual}")]
    KindMismatch { expected: ValueKind, actual: ValueKind },
}

impl ValueError {
    pub(crate) fn decode(kind: ValueKind, raw: &str, reason: impl ToString) -> Self {
        ValueError::Decode {
            kind,
            raw: raw.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ValueError::Decode { .. } => "REDEX_VALUE_DECODE",
            ValueError::KindMismatch { .. } => "REDEX_VALUE_KIND_MISMATCH",
        }
    }
}
