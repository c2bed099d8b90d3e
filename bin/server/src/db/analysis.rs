//! Analysis repository.
//!
//! Every statement filters on `user_id`; single-row statements filter on
//! `id AND user_id`, so a row owned by someone else is indistinguishable
//! from a missing one.

use super::{Attempt, store_error, with_retry, with_retry_attempt};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use greek_study_analysis::{Analysis, AnalysisDraft, AnalysisStore, AnalysisSummary};
use greek_study_core::{AnalysisId, StoreError, UserId};
use rootcause::prelude::Report;
use sqlx::{FromRow, PgPool};
use tracing::instrument;

const ENTITY: &str = "analysis";

/// Row type for full analysis queries.
#[derive(FromRow)]
struct AnalysisRow {
    id: i64,
    user_id: i64,
    title: String,
    description: String,
    details: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AnalysisRow> for Analysis {
    fn from(row: AnalysisRow) -> Self {
        Self {
            id: AnalysisId::new(row.id),
            user_id: UserId::new(row.user_id),
            title: row.title,
            description: row.description,
            details: row.details,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Row type for listings; never selects `details`.
#[derive(FromRow)]
struct AnalysisSummaryRow {
    id: i64,
    user_id: i64,
    title: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AnalysisSummaryRow> for AnalysisSummary {
    fn from(row: AnalysisSummaryRow) -> Self {
        Self {
            id: AnalysisId::new(row.id),
            user_id: UserId::new(row.user_id),
            title: row.title,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for analyses.
#[derive(Clone)]
pub struct PgAnalysisRepository {
    pool: PgPool,
}

impl PgAnalysisRepository {
    /// Creates a new analysis repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnalysisStore for PgAnalysisRepository {
    /// Not retried: a lost acknowledgement would otherwise insert twice.
    #[instrument(skip(self, draft), fields(user_id = %user_id))]
    async fn insert(
        &self,
        user_id: UserId,
        draft: &AnalysisDraft,
    ) -> Result<AnalysisId, Report<StoreError>> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO analyses (user_id, title, description, details)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(user_id.get())
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.details)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(AnalysisId::new(id))
    }

    #[instrument(skip(self, draft), fields(user_id = %user_id, analysis_id = %id))]
    async fn update(
        &self,
        user_id: UserId,
        id: AnalysisId,
        draft: &AnalysisDraft,
    ) -> Result<(), Report<StoreError>> {
        let pool = &self.pool;
        let result = with_retry("update_analysis", move || {
            sqlx::query(
                r#"
                UPDATE analyses
                SET title = $1,
                    description = $2,
                    details = $3,
                    updated_at = NOW()
                WHERE id = $4 AND user_id = $5
                "#,
            )
            .bind(&draft.title)
            .bind(&draft.description)
            .bind(&draft.details)
            .bind(id.get())
            .bind(user_id.get())
            .execute(pool)
        })
        .await
        .map_err(store_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(ENTITY, id).into());
        }
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %user_id, analysis_id = %id))]
    async fn get(&self, user_id: UserId, id: AnalysisId) -> Result<Analysis, Report<StoreError>> {
        let pool = &self.pool;
        let row = with_retry("get_analysis", move || {
            sqlx::query_as::<_, AnalysisRow>(
                r#"
                SELECT id, user_id, title, description, details, created_at, updated_at
                FROM analyses
                WHERE id = $1 AND user_id = $2
                "#,
            )
            .bind(id.get())
            .bind(user_id.get())
            .fetch_optional(pool)
        })
        .await
        .map_err(store_error)?;

        row.map(Analysis::from)
            .ok_or_else(|| StoreError::not_found(ENTITY, id).into())
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn most_recent(&self, user_id: UserId) -> Result<Analysis, Report<StoreError>> {
        let pool = &self.pool;
        let row = with_retry("most_recent_analysis", move || {
            sqlx::query_as::<_, AnalysisRow>(
                r#"
                SELECT id, user_id, title, description, details, created_at, updated_at
                FROM analyses
                WHERE user_id = $1
                ORDER BY updated_at DESC, id DESC
                LIMIT 1
                "#,
            )
            .bind(user_id.get())
            .fetch_optional(pool)
        })
        .await
        .map_err(store_error)?;

        row.map(Analysis::from)
            .ok_or_else(|| StoreError::not_found(ENTITY, "most recent").into())
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn list(&self, user_id: UserId) -> Result<Vec<AnalysisSummary>, Report<StoreError>> {
        let pool = &self.pool;
        let rows = with_retry("list_analyses", move || {
            sqlx::query_as::<_, AnalysisSummaryRow>(
                r#"
                SELECT id, user_id, title, description, created_at, updated_at
                FROM analyses
                WHERE user_id = $1
                ORDER BY updated_at DESC, id DESC
                "#,
            )
            .bind(user_id.get())
            .fetch_all(pool)
        })
        .await
        .map_err(store_error)?;

        Ok(rows.into_iter().map(AnalysisSummary::from).collect())
    }

    #[instrument(skip(self), fields(user_id = %user_id, analysis_id = %id))]
    async fn delete(&self, user_id: UserId, id: AnalysisId) -> Result<(), Report<StoreError>> {
        let pool = &self.pool;
        let (result, attempt) = with_retry_attempt("delete_analysis", move || {
            sqlx::query("DELETE FROM analyses WHERE id = $1 AND user_id = $2")
                .bind(id.get())
                .bind(user_id.get())
                .execute(pool)
        })
        .await
        .map_err(store_error)?;

        delete_outcome(result.rows_affected(), attempt, id).map_err(Into::into)
    }
}

/// Interprets the row count of an owner-scoped delete.
///
/// Nothing deleted on the first attempt means the row is missing or
/// foreign. On a retry it may mean the first attempt committed before its
/// connection failed, so the delete counts as done.
fn delete_outcome(rows_affected: u64, attempt: Attempt, id: AnalysisId) -> Result<(), StoreError> {
    match (rows_affected, attempt) {
        (0, Attempt::First) => Err(StoreError::not_found(ENTITY, id)),
        _ => Ok(()),
    }
}
