//! Error types for the platform-access crate.
//!
//! - `AuthenticationError`: failures establishing who is calling
//!   (credential extraction, token verification, identity resolution,
//!   the login handshake)
//! - `KeyCacheError`: failures fetching the provider's signing keys

use std::fmt;

/// Errors from authentication operations.
///
/// Every variant is terminal for the request that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationError {
    /// No credential, or not a bearer credential.
    Unauthenticated,
    /// Token is malformed, badly signed, or uses an unexpected algorithm.
    InvalidToken { reason: String },
    /// Token has expired.
    TokenExpired,
    /// Token names a key id absent from every fetched key set.
    UnknownKey { kid: String },
    /// Token issuer differs from the configured issuer.
    IssuerMismatch,
    /// Token audience contains none of the accepted audiences.
    AudienceMismatch,
    /// Token is valid but no user record exists for its subject.
    UserNotFound { subject: String },
    /// A login handshake step failed.
    AuthenticationFailed { reason: String },
    /// The signing keys could not be fetched.
    KeySetUnavailable { reason: String },
    /// The provider could not be reached for a profile or token exchange.
    ProviderUnavailable { reason: String },
    /// The user store failed while resolving the caller.
    Storage { details: String },
}

impl AuthenticationError {
    /// Short machine-readable name of the failure.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::InvalidToken { .. } => "invalid_token",
            Self::TokenExpired => "token_expired",
            Self::UnknownKey { .. } => "unknown_key",
            Self::IssuerMismatch => "issuer_mismatch",
            Self::AudienceMismatch => "audience_mismatch",
            Self::UserNotFound { .. } => "user_not_found",
            Self::AuthenticationFailed { .. } => "authentication_failed",
            Self::KeySetUnavailable { .. }
            | Self::ProviderUnavailable { .. }
            | Self::Storage { .. } => "storage_error",
        }
    }

    /// Returns true when the failure lies with the caller's credential
    /// rather than with this service or its dependencies.
    #[must_use]
    pub fn is_credential_failure(&self) -> bool {
        !matches!(
            self,
            Self::KeySetUnavailable { .. }
                | Self::ProviderUnavailable { .. }
                | Self::Storage { .. }
        )
    }
}

impl fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => {
                write!(f, "authorization header missing or not a bearer token")
            }
            Self::InvalidToken { reason } => {
                write!(f, "invalid token: {reason}")
            }
            Self::TokenExpired => {
                write!(f, "token has expired")
            }
            Self::UnknownKey { kid } => {
                write!(f, "token signed with unknown key: {kid}")
            }
            Self::IssuerMismatch => {
                write!(f, "token issuer does not match")
            }
            Self::AudienceMismatch => {
                write!(f, "token audience does not match")
            }
            Self::UserNotFound { subject } => {
                write!(f, "user not found for subject: {subject}")
            }
            Self::AuthenticationFailed { reason } => {
                write!(f, "authentication failed: {reason}")
            }
            Self::KeySetUnavailable { reason } => {
                write!(f, "signing keys unavailable: {reason}")
            }
            Self::ProviderUnavailable { reason } => {
                write!(f, "identity provider unavailable: {reason}")
            }
            Self::Storage { details } => {
                write!(f, "user store error: {details}")
            }
        }
    }
}

impl std::error::Error for AuthenticationError {}

/// Errors from fetching the provider's key set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyCacheError {
    /// The HTTP client could not be built.
    Client { details: String },
    /// The key set could not be fetched.
    FetchFailed { url: String, error: String },
    /// The key set response was not a valid JWKS document.
    ParseFailed { url: String, error: String },
}

impl fmt::Display for KeyCacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client { details } => {
                write!(f, "failed to build key-set client: {details}")
            }
            Self::FetchFailed { url, error } => {
                write!(f, "failed to fetch key set from {url}: {error}")
            }
            Self::ParseFailed { url, error } => {
                write!(f, "failed to parse key set from {url}: {error}")
            }
        }
    }
}

impl std::error::Error for KeyCacheError {}
