//! Analysis types.
//!
//! An analysis is a user's saved work on a passage: a title, a description,
//! and a free-form JSON document (`details`) that the frontend owns. The
//! server never interprets `details` beyond requiring it to be an object.

use crate::error::AnalysisValidationError;
use chrono::{DateTime, Utc};
use greek_study_core::{AnalysisId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum title length in characters. Matches the column width.
pub const MAX_TITLE_CHARS: usize = 100;

/// A stored analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub id: AnalysisId,
    /// The owner. Every read and write is filtered on this.
    pub user_id: UserId,
    pub title: String,
    pub description: String,
    pub details: Value,
    pub created_at: DateTime<Utc>,
    /// Refreshed on every update.
    pub updated_at: DateTime<Utc>,
}

impl Analysis {
    /// Returns the listing view of this analysis.
    #[must_use]
    pub fn summary(&self) -> AnalysisSummary {
        AnalysisSummary {
            id: self.id,
            user_id: self.user_id,
            title: self.title.clone(),
            description: self.description.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// An analysis without its details payload, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub id: AnalysisId,
    pub user_id: UserId,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The client-supplied part of an analysis, used for both create and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub details: Value,
}

impl AnalysisDraft {
    #[must_use]
    pub fn new(title: impl Into<String>, description: impl Into<String>, details: Value) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            details,
        }
    }

    /// Checks the draft against the storage constraints.
    ///
    /// # Errors
    ///
    /// Returns an error if the title exceeds [`MAX_TITLE_CHARS`] or the
    /// details are not a JSON object.
    pub fn validate(&self) -> Result<(), AnalysisValidationError> {
        let title_chars = self.title.chars().count();
        if title_chars > MAX_TITLE_CHARS {
            return Err(AnalysisValidationError::new(
                "title",
                format!("{title_chars} characters exceeds the limit of {MAX_TITLE_CHARS}"),
            ));
        }
        if !self.details.is_object() {
            return Err(AnalysisValidationError::new(
                "details",
                "must be a JSON object",
            ));
        }
        Ok(())
    }
}

/// Which analysis a read refers to.
///
/// The path id `0` has always meant "the caller's most recently updated
/// analysis"; that sentinel is decoded here and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisSelector {
    MostRecent,
    ById(AnalysisId),
}

impl AnalysisSelector {
    /// Raw path id that selects the most recent analysis.
    pub const MOST_RECENT_SENTINEL: i64 = 0;
}

impl From<AnalysisId> for AnalysisSelector {
    fn from(id: AnalysisId) -> Self {
        if id.get() == Self::MOST_RECENT_SENTINEL {
            Self::MostRecent
        } else {
            Self::ById(id)
        }
    }
}
