//! User provisioning and profile routes.

use axum::{
    Json,
    extract::{Path, State, rejection::PathRejection},
};
use greek_study_core::UserId;
use greek_study_platform_access::AuthenticationError;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use super::ApiState;
use crate::auth::{RequireClaims, RequireUser};
use crate::error::ApiError;

/// Response of `POST /api/user`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionResponse {
    pub user_id: UserId,
}

/// Public view of a user record.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub picture: Option<String>,
}

/// Creates or refreshes the caller's account from the provider's user-info.
///
/// The token only has to verify; its subject need not have an account yet.
pub async fn provision(
    State(state): State<Arc<ApiState>>,
    RequireClaims { claims, token }: RequireClaims,
) -> Result<Json<ProvisionResponse>, ApiError> {
    let profile = state.profiles.fetch_profile(&token).await?;

    if profile.subject != claims.subject {
        warn!(
            subject = claims.subject.as_str(),
            profile_subject = profile.subject.as_str(),
            "user-info subject does not match token"
        );
        return Err(AuthenticationError::AuthenticationFailed {
            reason: "user-info subject does not match token subject".to_string(),
        }
        .into());
    }

    let user_id = state.identity.upsert_from_idp(&profile).await?;
    Ok(Json(ProvisionResponse { user_id }))
}

/// Returns the caller's own profile. Any other id is reported as missing.
pub async fn get_user(
    State(state): State<Arc<ApiState>>,
    RequireUser(caller): RequireUser,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<UserView>, ApiError> {
    let Path(id) = path?;
    let id = UserId::new(id);
    if id != caller.user_id() {
        return Err(ApiError::NotFound);
    }

    let user = state
        .identity
        .find_user(id)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(UserView {
        id: user.id(),
        name: user.name().map(str::to_string),
        nickname: user.nickname().map(str::to_string),
        picture: user.picture().map(str::to_string),
    }))
}
