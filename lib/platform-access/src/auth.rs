//! Request authentication.
//!
//! Runs the three per-request steps in their fixed order: extract the bearer
//! credential, verify it, then resolve the subject to an internal user. The
//! resulting `AuthenticatedUser` is the only way a handler learns who is
//! calling, and its `user_id` is what every owner-scoped store method takes.

use crate::claims::ValidatedClaims;
use crate::error::AuthenticationError;
use crate::identity::IdentityResolver;
use crate::verifier::{TokenVerifier, extract_bearer};
use greek_study_core::UserId;
use tracing::debug;

/// The verified caller of a request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    user_id: UserId,
    claims: ValidatedClaims,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn new(user_id: UserId, claims: ValidatedClaims) -> Self {
        Self { user_id, claims }
    }

    /// Returns the internal id of the caller.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the caller's verified claims.
    #[must_use]
    pub fn claims(&self) -> &ValidatedClaims {
        &self.claims
    }

    /// Returns the provider subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.claims.subject
    }
}

/// Authenticates a request from its `Authorization` header value.
///
/// # Errors
///
/// Returns the first failing step's error; later steps do not run.
pub async fn authenticate(
    verifier: &TokenVerifier,
    resolver: &IdentityResolver,
    authorization: Option<&str>,
) -> Result<AuthenticatedUser, AuthenticationError> {
    let token = extract_bearer(authorization)?;
    let claims = verifier.verify(token).await?;
    let user_id = resolver.resolve_by_subject(&claims.subject).await?;
    debug!(user_id = %user_id, subject = claims.subject.as_str(), "request authenticated");
    Ok(AuthenticatedUser::new(user_id, claims))
}
