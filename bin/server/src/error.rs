//! HTTP error responses.
//!
//! Every failure leaving the API becomes an `ApiError`, rendered as
//! `{"error": "<kind>", "message": "<safe message>"}`. Internal detail is
//! logged here and never written to the body.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use greek_study_analysis::AnalysisValidationError;
use greek_study_core::StoreError;
use greek_study_platform_access::AuthenticationError;
use rootcause::prelude::Report;
use serde::Serialize;
use std::fmt;

/// Errors returned by API handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The caller could not be authenticated.
    Authentication(AuthenticationError),
    /// The resource does not exist or is not the caller's.
    NotFound,
    /// The request is malformed.
    Validation { message: String },
    /// A dependency failed. Carries the internal detail for the log only.
    Storage { details: String },
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl ApiError {
    /// Builds a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Authentication(e) if e.is_credential_failure() => StatusCode::UNAUTHORIZED,
            Self::Authentication(_) | Self::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            Self::Authentication(e) if !e.is_credential_failure() => ErrorBody {
                error: "storage_error",
                message: "internal server error".to_string(),
            },
            Self::Authentication(e) => ErrorBody {
                error: e.kind(),
                message: credential_message(e).to_string(),
            },
            Self::NotFound => ErrorBody {
                error: "not_found",
                message: "resource not found".to_string(),
            },
            Self::Validation { message } => ErrorBody {
                error: "validation_error",
                message: message.clone(),
            },
            Self::Storage { .. } => ErrorBody {
                error: "storage_error",
                message: "internal server error".to_string(),
            },
        }
    }
}

fn credential_message(err: &AuthenticationError) -> &'static str {
    match err {
        AuthenticationError::Unauthenticated => "a bearer token is required",
        AuthenticationError::TokenExpired => "token has expired",
        AuthenticationError::UserNotFound { .. } => "no account for this identity; log in again",
        AuthenticationError::AuthenticationFailed { .. } => "authentication failed",
        _ => "invalid bearer token",
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication(e) => write!(f, "authentication error: {e}"),
            Self::NotFound => write!(f, "not found"),
            Self::Validation { message } => write!(f, "validation error: {message}"),
            Self::Storage { details } => write!(f, "storage error: {details}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}

impl From<AuthenticationError> for ApiError {
    fn from(err: AuthenticationError) -> Self {
        Self::Authentication(err)
    }
}

impl From<AnalysisValidationError> for ApiError {
    fn from(err: AnalysisValidationError) -> Self {
        Self::validation(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<Report<StoreError>> for ApiError {
    fn from(report: Report<StoreError>) -> Self {
        match report.current_context() {
            StoreError::NotFound { .. } => Self::NotFound,
            _ => Self::Storage {
                details: report.to_string(),
            },
        }
    }
}
