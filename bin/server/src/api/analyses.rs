//! Analysis routes.
//!
//! Handlers pass the caller's id with every store call; the store filters
//! on both ids, so another user's analysis comes back as 404.

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use greek_study_analysis::{Analysis, AnalysisDraft, AnalysisSelector, AnalysisSummary};
use greek_study_core::AnalysisId;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

use super::ApiState;
use crate::auth::RequireUser;
use crate::error::ApiError;

/// Response of `POST /api/analyses`.
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: AnalysisId,
}

fn analysis_id(path: Result<Path<i64>, PathRejection>) -> Result<AnalysisId, ApiError> {
    let Path(id) = path?;
    Ok(AnalysisId::new(id))
}

fn draft(body: Result<Json<AnalysisDraft>, JsonRejection>) -> Result<AnalysisDraft, ApiError> {
    let Json(draft) = body?;
    draft.validate()?;
    Ok(draft)
}

pub async fn create(
    State(state): State<Arc<ApiState>>,
    RequireUser(caller): RequireUser,
    body: Result<Json<AnalysisDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let draft = draft(body)?;
    let id = state.analyses.insert(caller.user_id(), &draft).await?;
    info!(user_id = %caller.user_id(), analysis_id = %id, "analysis created");
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// Replaces title, description, and details. Last write wins.
pub async fn update(
    State(state): State<Arc<ApiState>>,
    RequireUser(caller): RequireUser,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<AnalysisDraft>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = analysis_id(path)?;
    let draft = draft(body)?;
    state.analyses.update(caller.user_id(), id, &draft).await?;
    Ok(Json(json!({ "success": true })))
}

/// Id `0` returns the most recently updated analysis.
pub async fn get(
    State(state): State<Arc<ApiState>>,
    RequireUser(caller): RequireUser,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Analysis>, ApiError> {
    let selector = AnalysisSelector::from(analysis_id(path)?);
    let analysis = state
        .analyses
        .get_selected(caller.user_id(), selector)
        .await?;
    Ok(Json(analysis))
}

pub async fn list(
    State(state): State<Arc<ApiState>>,
    RequireUser(caller): RequireUser,
) -> Result<Json<Vec<AnalysisSummary>>, ApiError> {
    Ok(Json(state.analyses.list(caller.user_id()).await?))
}

pub async fn delete(
    State(state): State<Arc<ApiState>>,
    RequireUser(caller): RequireUser,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = analysis_id(path)?;
    state.analyses.delete(caller.user_id(), id).await?;
    info!(user_id = %caller.user_id(), analysis_id = %id, "analysis deleted");
    Ok(StatusCode::NO_CONTENT)
}
