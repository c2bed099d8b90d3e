//! Error types for the analysis crate.

use std::fmt;

/// A request body that cannot become an analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisValidationError {
    /// The offending field.
    pub field: &'static str,
    /// What is wrong with it.
    pub reason: String,
}

impl AnalysisValidationError {
    pub(crate) fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for AnalysisValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {}", self.field, self.reason)
    }
}

impl std::error::Error for AnalysisValidationError {}
