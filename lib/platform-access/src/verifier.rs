//! Bearer token verification.

use crate::claims::ValidatedClaims;
use crate::error::AuthenticationError;
use crate::keys::KeyStore;
use crate::oidc::{OidcConfig, OidcConfigError};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, Validation};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Verifies bearer tokens issued by the configured provider.
///
/// Holds no mutable state of its own; the key store is injected so tests
/// can substitute a fixed key set.
#[derive(Clone)]
pub struct TokenVerifier {
    keys: Arc<dyn KeyStore>,
    issuer: String,
    audiences: Vec<String>,
    algorithm: Algorithm,
    leeway: Duration,
}

impl TokenVerifier {
    /// Creates a verifier.
    #[must_use]
    pub fn new(
        keys: Arc<dyn KeyStore>,
        issuer: String,
        audiences: Vec<String>,
        algorithm: Algorithm,
        leeway: Duration,
    ) -> Self {
        Self {
            keys,
            issuer,
            audiences,
            algorithm,
            leeway,
        }
    }

    /// Creates a verifier from the provider configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured algorithm is unusable.
    pub fn from_config(
        config: &OidcConfig,
        keys: Arc<dyn KeyStore>,
    ) -> Result<Self, OidcConfigError> {
        Ok(Self::new(
            keys,
            config.issuer_url().to_string(),
            config.accepted_audiences(),
            config.signing_algorithm()?,
            config.clock_skew(),
        ))
    }

    /// Creates a verifier for ID tokens from the login handshake.
    ///
    /// ID tokens are addressed to this client, so the client id is the only
    /// accepted audience. Keys come from the same store as bearer tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured algorithm is unusable.
    pub fn for_id_tokens(
        config: &OidcConfig,
        keys: Arc<dyn KeyStore>,
    ) -> Result<Self, OidcConfigError> {
        Ok(Self::new(
            keys,
            config.issuer_url().to_string(),
            vec![config.client_id().to_string()],
            config.signing_algorithm()?,
            config.clock_skew(),
        ))
    }

    /// Returns the issuer tokens must carry.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Verifies `token` and returns its claims.
    ///
    /// A token naming an unknown key id triggers at most one key-store
    /// refresh; the store itself decides whether that refresh hits the
    /// network.
    ///
    /// # Errors
    ///
    /// Returns the verification failure. Nothing is retried apart from the
    /// single key refresh.
    pub async fn verify(&self, token: &str) -> Result<ValidatedClaims, AuthenticationError> {
        let header = jsonwebtoken::decode_header(token).map_err(|e| {
            AuthenticationError::InvalidToken {
                reason: format!("malformed header: {e}"),
            }
        })?;

        if header.alg != self.algorithm {
            return Err(AuthenticationError::InvalidToken {
                reason: format!("unexpected algorithm {:?}", header.alg),
            });
        }

        let kid = header.kid.ok_or_else(|| AuthenticationError::InvalidToken {
            reason: "missing key id".to_string(),
        })?;

        let key = match self.keys.get_key(&kid).await {
            Some(key) => key,
            None => {
                debug!(kid = kid.as_str(), "unknown key id, refreshing key set");
                let refreshed = self.keys.refresh().await;
                match (self.keys.get_key(&kid).await, refreshed) {
                    (Some(key), _) => key,
                    (None, Err(report)) => {
                        warn!(kid = kid.as_str(), error = %report, "key set refresh failed");
                        return Err(AuthenticationError::KeySetUnavailable {
                            reason: report.current_context().to_string(),
                        });
                    }
                    (None, Ok(_)) => return Err(AuthenticationError::UnknownKey { kid }),
                }
            }
        };

        let mut validation = Validation::new(self.algorithm);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&self.audiences);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = self.leeway.as_secs();

        let data = jsonwebtoken::decode::<ValidatedClaims>(token, key.decoding_key(), &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthenticationError::TokenExpired,
                ErrorKind::InvalidIssuer => AuthenticationError::IssuerMismatch,
                ErrorKind::InvalidAudience => AuthenticationError::AudienceMismatch,
                _ => AuthenticationError::InvalidToken {
                    reason: e.to_string(),
                },
            })?;

        let claims = data.claims;
        let now = chrono::Utc::now().timestamp();
        let leeway = i64::try_from(self.leeway.as_secs()).unwrap_or(i64::MAX);
        if claims.issued_at > now.saturating_add(leeway) {
            return Err(AuthenticationError::InvalidToken {
                reason: "issued in the future".to_string(),
            });
        }

        Ok(claims)
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("issuer", &self.issuer)
            .field("audiences", &self.audiences)
            .field("algorithm", &self.algorithm)
            .field("leeway", &self.leeway)
            .finish()
    }
}

/// Extracts the token from an `Authorization` header value.
///
/// # Errors
///
/// Returns `Unauthenticated` when the header is absent, uses another scheme,
/// or carries an empty token.
pub fn extract_bearer(header: Option<&str>) -> Result<&str, AuthenticationError> {
    let value = header.ok_or(AuthenticationError::Unauthenticated)?.trim();
    let (scheme, token) = value
        .split_once(' ')
        .ok_or(AuthenticationError::Unauthenticated)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthenticationError::Unauthenticated);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthenticationError::Unauthenticated);
    }
    Ok(token)
}
