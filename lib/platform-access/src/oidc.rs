//! OIDC (OpenID Connect) configuration.
//!
//! This module provides configuration types for connecting to the external
//! identity provider, both for the browser login handshake and for verifying
//! the bearer tokens it issues.

use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Configuration for the OIDC identity provider.
///
/// Fields with defaults can be omitted when loading from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OidcConfig {
    /// The OIDC issuer URL (e.g., "https://tenant.auth0.com/").
    /// Used for discovery and compared byte-for-byte against the `iss` claim.
    issuer_url: String,
    /// The OAuth2 client ID registered with the provider.
    client_id: String,
    /// The OAuth2 client secret.
    client_secret: String,
    /// The redirect URI for the OAuth2 callback (e.g., "https://app.example.com/callback").
    redirect_uri: String,
    /// OAuth2 scopes to request as a comma-separated string.
    /// Default: "openid,profile,email"
    #[serde(default = "default_scopes")]
    scopes: String,
    /// Accepted access-token audiences as a comma-separated string.
    /// When empty, only the client ID is accepted.
    #[serde(default)]
    audiences: String,
    /// The asymmetric signing algorithm tokens must use.
    /// Default: "RS256"
    #[serde(default = "default_algorithm")]
    algorithm: String,
    /// Tolerated clock skew for `exp` and `iat`, in seconds.
    #[serde(default = "default_clock_skew_seconds")]
    clock_skew_seconds: u64,
    /// Interval of the background key-set refresh, in seconds.
    #[serde(default = "default_jwks_refresh_interval_seconds")]
    jwks_refresh_interval_seconds: u64,
    /// Minimum time between forced key-set refreshes, in seconds.
    #[serde(default = "default_jwks_min_refresh_seconds")]
    jwks_min_refresh_seconds: u64,
    /// Explicit JWKS URL; discovered from provider metadata when absent.
    #[serde(default)]
    jwks_url: Option<String>,
    /// Explicit user-info URL; discovered from provider metadata when absent.
    #[serde(default)]
    userinfo_url: Option<String>,
    /// Explicit logout URL; `<issuer>/v2/logout` when absent.
    #[serde(default)]
    logout_url: Option<String>,
}

fn default_scopes() -> String {
    "openid,profile,email".to_string()
}

fn default_algorithm() -> String {
    "RS256".to_string()
}

fn default_clock_skew_seconds() -> u64 {
    60
}

fn default_jwks_refresh_interval_seconds() -> u64 {
    600
}

fn default_jwks_min_refresh_seconds() -> u64 {
    300
}

/// Configuration values that cannot be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OidcConfigError {
    /// The configured algorithm is unknown or not asymmetric.
    UnsupportedAlgorithm { algorithm: String },
}

impl fmt::Display for OidcConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedAlgorithm { algorithm } => {
                write!(f, "unsupported token signing algorithm: {algorithm}")
            }
        }
    }
}

impl std::error::Error for OidcConfigError {}

impl OidcConfig {
    /// Creates a new OIDC configuration with defaults for optional fields.
    #[must_use]
    pub fn new(
        issuer_url: String,
        client_id: String,
        client_secret: String,
        redirect_uri: String,
    ) -> Self {
        Self {
            issuer_url,
            client_id,
            client_secret,
            redirect_uri,
            scopes: default_scopes(),
            audiences: String::new(),
            algorithm: default_algorithm(),
            clock_skew_seconds: default_clock_skew_seconds(),
            jwks_refresh_interval_seconds: default_jwks_refresh_interval_seconds(),
            jwks_min_refresh_seconds: default_jwks_min_refresh_seconds(),
            jwks_url: None,
            userinfo_url: None,
            logout_url: None,
        }
    }

    /// Creates a configuration builder for more customization.
    #[must_use]
    pub fn builder(
        issuer_url: String,
        client_id: String,
        client_secret: String,
        redirect_uri: String,
    ) -> OidcConfigBuilder {
        OidcConfigBuilder::new(issuer_url, client_id, client_secret, redirect_uri)
    }

    /// Returns the OIDC issuer URL.
    #[must_use]
    pub fn issuer_url(&self) -> &str {
        &self.issuer_url
    }

    /// Returns the OAuth2 client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the OAuth2 client secret.
    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Returns the OAuth2 redirect URI.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Returns the OAuth2 scopes to request, parsed from comma-separated string.
    #[must_use]
    pub fn scopes(&self) -> Vec<&str> {
        split_list(&self.scopes)
    }

    /// Returns the configured API audiences, in order.
    #[must_use]
    pub fn audiences(&self) -> Vec<&str> {
        split_list(&self.audiences)
    }

    /// Returns the audiences a bearer token may carry.
    ///
    /// Falls back to the client ID so ID tokens verify when no API
    /// audience is configured.
    #[must_use]
    pub fn accepted_audiences(&self) -> Vec<String> {
        let configured = self.audiences();
        if configured.is_empty() {
            vec![self.client_id.clone()]
        } else {
            configured.into_iter().map(str::to_string).collect()
        }
    }

    /// Returns the signing algorithm tokens must use.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown names and for symmetric (HMAC) algorithms.
    pub fn signing_algorithm(&self) -> Result<Algorithm, OidcConfigError> {
        let unsupported = || OidcConfigError::UnsupportedAlgorithm {
            algorithm: self.algorithm.clone(),
        };
        let algorithm = Algorithm::from_str(self.algorithm.trim()).map_err(|_| unsupported())?;
        match algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Err(unsupported()),
            asymmetric => Ok(asymmetric),
        }
    }

    /// Returns the tolerated clock skew.
    #[must_use]
    pub fn clock_skew(&self) -> Duration {
        Duration::from_secs(self.clock_skew_seconds)
    }

    /// Returns the interval of the background key-set refresh.
    #[must_use]
    pub fn jwks_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.jwks_refresh_interval_seconds)
    }

    /// Returns the minimum time between forced key-set refreshes.
    #[must_use]
    pub fn jwks_min_refresh(&self) -> Duration {
        Duration::from_secs(self.jwks_min_refresh_seconds)
    }

    /// Returns the explicit JWKS URL, if configured.
    #[must_use]
    pub fn jwks_url(&self) -> Option<&str> {
        self.jwks_url.as_deref()
    }

    /// Returns the explicit user-info URL, if configured.
    #[must_use]
    pub fn userinfo_url(&self) -> Option<&str> {
        self.userinfo_url.as_deref()
    }

    /// Returns the provider logout URL.
    #[must_use]
    pub fn logout_url(&self) -> String {
        match &self.logout_url {
            Some(url) => url.clone(),
            None => format!("{}/v2/logout", self.issuer_url.trim_end_matches('/')),
        }
    }
}

fn split_list(raw: &str) -> Vec<&str> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Builder for `OidcConfig`.
#[derive(Debug)]
pub struct OidcConfigBuilder {
    config: OidcConfig,
    scopes: Vec<String>,
    audiences: Vec<String>,
}

impl OidcConfigBuilder {
    /// Creates a new builder with required fields.
    #[must_use]
    pub fn new(
        issuer_url: String,
        client_id: String,
        client_secret: String,
        redirect_uri: String,
    ) -> Self {
        Self {
            config: OidcConfig::new(issuer_url, client_id, client_secret, redirect_uri),
            scopes: vec![
                "openid".to_string(),
                "profile".to_string(),
                "email".to_string(),
            ],
            audiences: Vec::new(),
        }
    }

    /// Sets the OAuth2 scopes to request.
    #[must_use]
    pub fn scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Adds a scope to the list of scopes to request.
    #[must_use]
    pub fn add_scope(mut self, scope: String) -> Self {
        if !self.scopes.contains(&scope) {
            self.scopes.push(scope);
        }
        self
    }

    /// Adds an accepted access-token audience.
    #[must_use]
    pub fn add_audience(mut self, audience: String) -> Self {
        if !self.audiences.contains(&audience) {
            self.audiences.push(audience);
        }
        self
    }

    /// Sets the signing algorithm name (e.g. "RS256", "ES256").
    #[must_use]
    pub fn algorithm(mut self, algorithm: String) -> Self {
        self.config.algorithm = algorithm;
        self
    }

    /// Sets the tolerated clock skew in seconds.
    #[must_use]
    pub fn clock_skew_seconds(mut self, seconds: u64) -> Self {
        self.config.clock_skew_seconds = seconds;
        self
    }

    /// Sets the minimum time between forced key-set refreshes.
    #[must_use]
    pub fn jwks_min_refresh_seconds(mut self, seconds: u64) -> Self {
        self.config.jwks_min_refresh_seconds = seconds;
        self
    }

    /// Sets an explicit JWKS URL.
    #[must_use]
    pub fn jwks_url(mut self, url: String) -> Self {
        self.config.jwks_url = Some(url);
        self
    }

    /// Sets an explicit user-info URL.
    #[must_use]
    pub fn userinfo_url(mut self, url: String) -> Self {
        self.config.userinfo_url = Some(url);
        self
    }

    /// Sets an explicit logout URL.
    #[must_use]
    pub fn logout_url(mut self, url: String) -> Self {
        self.config.logout_url = Some(url);
        self
    }

    /// Builds the `OidcConfig`.
    #[must_use]
    pub fn build(self) -> OidcConfig {
        OidcConfig {
            scopes: self.scopes.join(","),
            audiences: self.audiences.join(","),
            ..self.config
        }
    }
}
