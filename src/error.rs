//! Crate-level error
//!
//! Wraps every subsystem error; `code()` returns the subsystem's stable code.

use thiserror::Error;

use crate::config::ConfigError;
use crate::index::IndexError;
use crate::planner::QueryError;
use crate::schema::SchemaError;
use crate::store::StoreError;
use crate::value::ValueError;
use crate::writer::WriteError;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Any error raised by redex
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Value(#[from] ValueError),
}

impl Error {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config(e) => e.code(),
            Error::Schema(e) => e.code(),
            Error::Write(e) => e.code(),
            Error::Query(e) => e.code(),
            Error::Index(e) => e.code(),
            Error::Store(e) => e.code(),
            Error::Value(e) => e.code(),
        }
    }

    /// Whether the caller can recover by changing its input or retrying
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Write(e) => e.is_recoverable(),
            _ => false,
        }
    }
}
