//! Authentication and identity for the Greek study tool.
//!
//! This crate provides:
//! - Provider configuration (`OidcConfig`)
//! - Signing-key caching (`KeyStore`, `JwksCache`, `StaticKeySet`)
//! - Bearer token verification (`TokenVerifier`, `ValidatedClaims`)
//! - Identity resolution (`IdentityResolver`, `UserStore`, `ProfileSource`)
//! - Per-request authentication (`authenticate`, `AuthenticatedUser`)
//!
//! # Request flow
//!
//! Verification strictly precedes identity resolution, which strictly
//! precedes any resource access:
//!
//! ```text
//! Authorization: Bearer <jwt>
//!   -> TokenVerifier::verify        (signature, iss, aud, exp, iat)
//!   -> IdentityResolver::resolve_by_subject
//!   -> AuthenticatedUser { user_id, claims }
//! ```
//!
//! # Example
//!
//! ```
//! use greek_study_platform_access::OidcConfig;
//!
//! let config = OidcConfig::builder(
//!     "https://greek.auth.example.com/".to_string(),
//!     "client-abc".to_string(),
//!     "secret".to_string(),
//!     "http://localhost:3000/callback".to_string(),
//! )
//! .add_audience("https://greek-study-tool/api".to_string())
//! .build();
//!
//! assert_eq!(config.accepted_audiences(), vec!["https://greek-study-tool/api"]);
//! assert_eq!(config.logout_url(), "https://greek.auth.example.com/v2/logout");
//! ```

pub mod auth;
pub mod claims;
pub mod error;
pub mod identity;
pub mod keys;
pub mod oidc;
pub mod user;
pub mod verifier;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

// Re-export main types at crate root
pub use auth::{AuthenticatedUser, authenticate};
pub use claims::{Audience, ValidatedClaims};
pub use error::{AuthenticationError, KeyCacheError};
pub use identity::{IdentityResolver, ProfileSource, UserStore};
pub use keys::{JwksCache, KeySet, KeyStore, RefreshOutcome, SigningKey, StaticKeySet};
pub use oidc::{OidcConfig, OidcConfigBuilder, OidcConfigError};
pub use user::{IdpProfile, User};
pub use verifier::{TokenVerifier, extract_bearer};
