//! OIDC client implementation using the openidconnect crate.

use greek_study_platform_access::{
    AuthenticationError, IdpProfile, OidcConfig, TokenVerifier, ValidatedClaims,
};
use openidconnect::core::{CoreAuthenticationFlow, CoreClient, CoreProviderMetadata};
use openidconnect::{
    AuthorizationCode, ClientId, ClientSecret, CsrfToken, IssuerUrl, Nonce, OAuth2TokenResponse,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope, TokenResponse,
};
use serde_json::Value;
use std::time::Duration;

/// Timeout for server-to-server calls to the provider.
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// OIDC client for the login handshake.
pub struct OidcClient {
    provider_metadata: CoreProviderMetadata,
    client_id: ClientId,
    client_secret: ClientSecret,
    redirect_url: RedirectUrl,
    http_client: reqwest::Client,
    config: OidcConfig,
}

/// Per-attempt secrets that the callback must present again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    pub csrf_token: String,
    pub pkce_verifier: String,
    pub nonce: String,
}

impl AuthState {
    /// Encodes the state for a cookie value.
    ///
    /// The three secrets are base64url, so `.` cannot occur inside them.
    #[must_use]
    pub fn to_cookie_value(&self) -> String {
        format!("{}.{}.{}", self.csrf_token, self.pkce_verifier, self.nonce)
    }

    /// Decodes a cookie value written by [`AuthState::to_cookie_value`].
    #[must_use]
    pub fn from_cookie_value(value: &str) -> Option<Self> {
        let mut parts = value.split('.');
        let (csrf_token, pkce_verifier, nonce) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() || [csrf_token, pkce_verifier, nonce].iter().any(|p| p.is_empty())
        {
            return None;
        }
        Some(Self {
            csrf_token: csrf_token.to_string(),
            pkce_verifier: pkce_verifier.to_string(),
            nonce: nonce.to_string(),
        })
    }
}

/// Result of a successful code exchange.
pub struct TokenResult {
    /// The compact ID token, if the provider sent one. Not yet verified.
    pub id_token: Option<String>,
    pub access_token: String,
}

impl OidcClient {
    /// Creates a new OIDC client by discovering the provider metadata.
    pub async fn discover(config: OidcConfig) -> Result<Self, OidcError> {
        let issuer_url = IssuerUrl::new(config.issuer_url().to_string())
            .map_err(|e| OidcError::Configuration(format!("invalid issuer URL: {e}")))?;

        let http_client = http_client()?;
        let provider_metadata = CoreProviderMetadata::discover_async(issuer_url, &http_client)
            .await
            .map_err(|e| OidcError::Discovery(format!("failed to discover provider: {e}")))?;

        Self::from_metadata(config, provider_metadata)
    }

    /// Creates a client from already-known provider metadata.
    pub fn from_metadata(
        config: OidcConfig,
        provider_metadata: CoreProviderMetadata,
    ) -> Result<Self, OidcError> {
        let redirect_url = RedirectUrl::new(config.redirect_uri().to_string())
            .map_err(|e| OidcError::Configuration(format!("invalid redirect URI: {e}")))?;

        Ok(Self {
            provider_metadata,
            client_id: ClientId::new(config.client_id().to_string()),
            client_secret: ClientSecret::new(config.client_secret().to_string()),
            redirect_url,
            http_client: http_client()?,
            config,
        })
    }

    /// Generates the authorization URL for redirecting the user.
    ///
    /// Carries state, nonce, and a PKCE challenge. When API audiences are
    /// configured the first one is requested as `audience`, so the access
    /// token comes back as a JWT this service can verify.
    pub fn authorization_url(&self) -> (String, AuthState) {
        let client = CoreClient::from_provider_metadata(
            self.provider_metadata.clone(),
            self.client_id.clone(),
            Some(self.client_secret.clone()),
        )
        .set_redirect_uri(self.redirect_url.clone());

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut auth_request = client
            .authorize_url(
                CoreAuthenticationFlow::AuthorizationCode,
                CsrfToken::new_random,
                Nonce::new_random,
            )
            .set_pkce_challenge(pkce_challenge);

        for scope in self.config.scopes() {
            auth_request = auth_request.add_scope(Scope::new(scope.to_string()));
        }
        if let Some(audience) = self.config.audiences().first() {
            auth_request = auth_request.add_extra_param("audience", audience.to_string());
        }

        let (auth_url, csrf_token, nonce) = auth_request.url();

        let state = AuthState {
            csrf_token: csrf_token.secret().clone(),
            pkce_verifier: pkce_verifier.secret().clone(),
            nonce: nonce.secret().clone(),
        };

        (auth_url.to_string(), state)
    }

    /// Exchanges the authorization code for tokens.
    ///
    /// The ID token comes back unverified; pass it to [`verify_id_token`]
    /// before using any of its claims.
    pub async fn exchange_code(
        &self,
        code: &str,
        state: &AuthState,
    ) -> Result<TokenResult, OidcError> {
        let client = CoreClient::from_provider_metadata(
            self.provider_metadata.clone(),
            self.client_id.clone(),
            Some(self.client_secret.clone()),
        )
        .set_redirect_uri(self.redirect_url.clone());

        let token_request = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .map_err(|e| OidcError::TokenExchange(format!("token endpoint error: {e}")))?;

        let token_response = token_request
            .set_pkce_verifier(PkceCodeVerifier::new(state.pkce_verifier.clone()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| OidcError::TokenExchange(format!("token exchange failed: {e}")))?;

        Ok(TokenResult {
            id_token: token_response.id_token().map(ToString::to_string),
            access_token: token_response.access_token().secret().clone(),
        })
    }

    /// Returns the JWKS URL: configured, else discovered.
    #[must_use]
    pub fn jwks_url(&self) -> String {
        match self.config.jwks_url() {
            Some(url) => url.to_string(),
            None => self.provider_metadata.jwks_uri().url().to_string(),
        }
    }

    /// Returns the user-info URL: configured, else discovered, else
    /// `<issuer>/userinfo`.
    #[must_use]
    pub fn userinfo_url(&self) -> String {
        if let Some(url) = self.config.userinfo_url() {
            return url.to_string();
        }
        match self.provider_metadata.userinfo_endpoint() {
            Some(endpoint) => endpoint.url().to_string(),
            None => format!("{}/userinfo", self.config.issuer_url().trim_end_matches('/')),
        }
    }

    /// Builds the provider logout URL that returns the browser to `return_to`.
    pub fn logout_url(&self, return_to: &str) -> Result<String, OidcError> {
        build_logout_url(&self.config, return_to)
    }

    /// Returns the configuration.
    pub fn config(&self) -> &OidcConfig {
        &self.config
    }
}

fn http_client() -> Result<reqwest::Client, OidcError> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(PROVIDER_TIMEOUT)
        .build()
        .map_err(|e| OidcError::Configuration(format!("failed to create HTTP client: {e}")))
}

/// Verifies an ID token from the code exchange and returns its profile.
///
/// Goes through the same key store as bearer tokens, so a key published
/// after startup is picked up by the store's refresh. The `nonce` claim must
/// match the one sent with this login attempt.
///
/// # Errors
///
/// Returns the verification failure, or `AuthenticationFailed` on a nonce
/// mismatch.
pub async fn verify_id_token(
    verifier: &TokenVerifier,
    id_token: &str,
    expected_nonce: &str,
) -> Result<IdpProfile, AuthenticationError> {
    let claims = verifier.verify(id_token).await?;

    if claims.extra.get("nonce").and_then(Value::as_str) != Some(expected_nonce) {
        return Err(AuthenticationError::AuthenticationFailed {
            reason: "ID token nonce mismatch".to_string(),
        });
    }

    Ok(profile_from_claims(&claims))
}

fn profile_from_claims(claims: &ValidatedClaims) -> IdpProfile {
    let text = |name: &str| {
        claims
            .extra
            .get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    IdpProfile {
        subject: claims.subject.clone(),
        given_name: text("given_name"),
        family_name: text("family_name"),
        nickname: text("nickname"),
        name: text("name"),
        picture: text("picture"),
        email: text("email"),
        email_verified: claims
            .extra
            .get("email_verified")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    }
}

/// Builds `<logout_url>?returnTo=..&client_id=..`.
pub fn build_logout_url(config: &OidcConfig, return_to: &str) -> Result<String, OidcError> {
    let url = reqwest::Url::parse_with_params(
        &config.logout_url(),
        &[("returnTo", return_to), ("client_id", config.client_id())],
    )
    .map_err(|e| OidcError::Configuration(format!("invalid logout URL: {e}")))?;
    Ok(url.to_string())
}

/// OIDC-related errors.
#[derive(Debug)]
pub enum OidcError {
    /// Configuration error (invalid URLs, etc.)
    Configuration(String),
    /// Failed to discover provider metadata.
    Discovery(String),
    /// Token exchange failed.
    TokenExchange(String),
}

impl std::fmt::Display for OidcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "OIDC configuration error: {msg}"),
            Self::Discovery(msg) => write!(f, "OIDC discovery error: {msg}"),
            Self::TokenExchange(msg) => write!(f, "OIDC token exchange error: {msg}"),
        }
    }
}

impl std::error::Error for OidcError {}
