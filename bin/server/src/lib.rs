//! Greek study tool web server.
//!
//! This crate provides the HTTP surface: the OIDC login handshake, the
//! bearer-authenticated JSON API for users and analyses, PostgreSQL
//! repositories, and static serving of the built frontend.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;

use api::ApiState;
use auth::LoginState;
use axum::{Router, http::StatusCode, routing::get};
use std::path::Path;
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Builds the full application router.
///
/// Paths not claimed by the API or the handshake fall through to the
/// frontend directory, with `index.html` for client-side routes.
pub fn app(api_state: Arc<ApiState>, login_state: Arc<LoginState>, static_dir: &Path) -> Router {
    let frontend =
        ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .route("/healthcheck", get(healthcheck))
        .merge(auth::router(login_state))
        .merge(api::router(api_state))
        .fallback_service(frontend)
        .layer(TraceLayer::new_for_http())
}

async fn healthcheck() -> StatusCode {
    StatusCode::OK
}
