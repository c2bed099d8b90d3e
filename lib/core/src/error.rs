//! Error handling foundation for the Greek study tool.
//!
//! This module provides the `Result` type alias using rootcause and the
//! storage error taxonomy shared by every store implementation. Each crate
//! defines its own domain-specific errors; stores report through
//! `Report<StoreError>` so callers can classify with `current_context()`.

use rootcause::Report;
use std::fmt;

/// A Result type alias using rootcause's Report for error handling.
///
/// Each layer adds its own context via `.context()` as errors propagate.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

/// Errors from a relational store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No row matched the filter.
    ///
    /// For owner-scoped resources this also covers "exists but belongs to
    /// someone else"; callers cannot tell the two apart.
    NotFound { entity: &'static str, id: String },
    /// A uniqueness or foreign-key constraint rejected the write.
    Conflict { details: String },
    /// The database failed or was unreachable.
    Database { details: String },
}

impl StoreError {
    /// Builds a `NotFound` for the given entity and id.
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns true for `NotFound`.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { entity, id } => write!(f, "{entity} '{id}' not found"),
            Self::Conflict { details } => write!(f, "store conflict: {details}"),
            Self::Database { details } => write!(f, "database error: {details}"),
        }
    }
}

impl std::error::Error for StoreError {}
