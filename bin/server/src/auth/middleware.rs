//! Bearer-token extractors for Axum.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use greek_study_platform_access::{
    AuthenticatedUser, ValidatedClaims, authenticate, extract_bearer,
};
use std::sync::Arc;

use crate::api::ApiState;
use crate::error::ApiError;

fn authorization_header(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

/// Extractor for a verified bearer token whose subject may not have an
/// account yet.
///
/// Only the provisioning endpoint uses this; everything else needs
/// [`RequireUser`].
pub struct RequireClaims {
    pub claims: ValidatedClaims,
    /// The raw token, for calls back to the provider on the caller's behalf.
    pub token: String,
}

impl<S> FromRequestParts<S> for RequireClaims
where
    Arc<ApiState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let api_state = Arc::<ApiState>::from_ref(state);
        let token = extract_bearer(authorization_header(parts))?;
        let claims = api_state.verifier.verify(token).await?;

        Ok(RequireClaims {
            claims,
            token: token.to_string(),
        })
    }
}

/// Extractor for requiring an authenticated user.
///
/// Rejects with a 401 JSON body unless the token verifies and its subject
/// has completed a login.
pub struct RequireUser(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireUser
where
    Arc<ApiState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let api_state = Arc::<ApiState>::from_ref(state);
        let user = authenticate(
            &api_state.verifier,
            &api_state.identity,
            authorization_header(parts),
        )
        .await?;

        Ok(RequireUser(user))
    }
}
