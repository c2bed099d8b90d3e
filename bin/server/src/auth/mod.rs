//! Authentication module for the Greek study server.
//!
//! This module provides:
//! - The OIDC login handshake (`/login`, `/callback`, `/logout`)
//! - The provider user-info client
//! - Bearer-token extractors for API routes
//!
//! # Token model
//!
//! The server keeps no sessions. The callback hands the provider's access
//! token to the browser, which presents it as `Authorization: Bearer` on
//! every API call. Each call is verified on its own; the only cookie is the
//! short-lived handshake state between `/login` and `/callback`.

pub mod middleware;
pub mod oidc;
pub mod routes;
pub mod userinfo;

use crate::config::SessionConfig;
use axum::{Router, routing::get};
use greek_study_platform_access::{IdentityResolver, ProfileSource, TokenVerifier};
use std::sync::Arc;

pub use middleware::{RequireClaims, RequireUser};
pub use oidc::OidcClient;
pub use routes::{callback, login, logout};
pub use userinfo::UserInfoClient;

/// State shared by the handshake routes.
pub struct LoginState {
    /// OIDC client for the handshake.
    pub oidc: OidcClient,
    /// Verifies ID tokens against the shared signing-key store.
    pub id_tokens: TokenVerifier,
    /// Records completed logins.
    pub identity: IdentityResolver,
    /// Profile fallback when the provider sends no ID token.
    pub profiles: Arc<dyn ProfileSource>,
    /// Handshake cookie and redirect settings.
    pub session: SessionConfig,
}

impl LoginState {
    /// Creates a new login state.
    pub fn new(
        oidc: OidcClient,
        id_tokens: TokenVerifier,
        identity: IdentityResolver,
        profiles: Arc<dyn ProfileSource>,
        session: SessionConfig,
    ) -> Self {
        Self {
            oidc,
            id_tokens,
            identity,
            profiles,
            session,
        }
    }
}

/// Builds the handshake routes.
pub fn router(state: Arc<LoginState>) -> Router {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/logout", get(logout))
        .with_state(state)
}
