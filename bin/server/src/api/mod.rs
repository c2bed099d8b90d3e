//! JSON API under `/api`.
//!
//! Every route takes a bearer-token extractor first, so a request without a
//! valid token is rejected before its path or body is looked at.

pub mod analyses;
pub mod user;

use crate::error::ApiError;
use axum::{
    Router,
    routing::{any, get, post},
};
use greek_study_analysis::AnalysisStore;
use greek_study_platform_access::{IdentityResolver, ProfileSource, TokenVerifier};
use std::sync::Arc;

/// State shared by API handlers.
pub struct ApiState {
    /// Verifies bearer tokens.
    pub verifier: TokenVerifier,
    /// Maps verified subjects to internal users.
    pub identity: IdentityResolver,
    /// Analysis storage.
    pub analyses: Arc<dyn AnalysisStore>,
    /// Provider profiles for provisioning.
    pub profiles: Arc<dyn ProfileSource>,
}

impl ApiState {
    /// Creates a new API state.
    pub fn new(
        verifier: TokenVerifier,
        identity: IdentityResolver,
        analyses: Arc<dyn AnalysisStore>,
        profiles: Arc<dyn ProfileSource>,
    ) -> Self {
        Self {
            verifier,
            identity,
            analyses,
            profiles,
        }
    }
}

/// Builds the API routes.
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/user", post(user::provision))
        .route("/api/user/{id}", get(user::get_user))
        .route("/api/analyses", get(analyses::list).post(analyses::create))
        .route(
            "/api/analyses/{id}",
            get(analyses::get)
                .patch(analyses::update)
                .delete(analyses::delete),
        )
        .route("/api/{*rest}", any(unknown_route))
        .with_state(state)
}

async fn unknown_route() -> ApiError {
    ApiError::NotFound
}
