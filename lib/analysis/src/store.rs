//! The analysis store seam.
//!
//! Every method takes the owning `UserId`. Methods that address a single
//! analysis take it together with the `AnalysisId` and must filter on both,
//! so an analysis is never reachable by id alone. A row that exists but
//! belongs to someone else is reported exactly like a missing row.

use crate::model::{Analysis, AnalysisDraft, AnalysisSelector, AnalysisSummary};
use async_trait::async_trait;
use greek_study_core::{AnalysisId, Result, StoreError, UserId};

/// Persistence for analyses, scoped by owner.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Creates an analysis owned by `user_id` and returns its new id.
    async fn insert(
        &self,
        user_id: UserId,
        draft: &AnalysisDraft,
    ) -> Result<AnalysisId, StoreError>;

    /// Replaces the content of an owned analysis and bumps `updated_at`.
    ///
    /// Fails with `NotFound` when no row matches both ids.
    async fn update(
        &self,
        user_id: UserId,
        id: AnalysisId,
        draft: &AnalysisDraft,
    ) -> Result<(), StoreError>;

    /// Returns an owned analysis, or `NotFound`.
    async fn get(&self, user_id: UserId, id: AnalysisId) -> Result<Analysis, StoreError>;

    /// Returns the owner's most recently updated analysis, or `NotFound`
    /// when they own none.
    async fn most_recent(&self, user_id: UserId) -> Result<Analysis, StoreError>;

    /// Lists the owner's analyses, most recently updated first.
    async fn list(&self, user_id: UserId) -> Result<Vec<AnalysisSummary>, StoreError>;

    /// Deletes an owned analysis, or fails with `NotFound`.
    async fn delete(&self, user_id: UserId, id: AnalysisId) -> Result<(), StoreError>;

    /// Reads the analysis a selector points at.
    async fn get_selected(
        &self,
        user_id: UserId,
        selector: AnalysisSelector,
    ) -> Result<Analysis, StoreError> {
        match selector {
            AnalysisSelector::MostRecent => self.most_recent(user_id).await,
            AnalysisSelector::ById(id) => self.get(user_id, id).await,
        }
    }
}
