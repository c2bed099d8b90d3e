//! Authentication routes for login, callback, and logout.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use greek_study_core::UserId;
use greek_study_platform_access::AuthenticationError;
use openidconnect::url::form_urlencoded;
use serde::Deserialize;
use std::sync::Arc;
use time::Duration as TimeDuration;
use tracing::{info, warn};

use super::{
    LoginState,
    oidc::{AuthState, verify_id_token},
};

/// Auth state cookie name (for CSRF protection during OIDC flow).
pub const AUTH_STATE_COOKIE: &str = "auth_state";

/// Query parameters for the OIDC callback.
///
/// All optional: a provider-side failure arrives as `error` with no code.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Initiates the OIDC login flow by redirecting to the identity provider.
pub async fn login(State(state): State<Arc<LoginState>>, jar: CookieJar) -> impl IntoResponse {
    let (auth_url, auth_state) = state.oidc.authorization_url();

    let cookie = Cookie::build((AUTH_STATE_COOKIE, auth_state.to_cookie_value()))
        .path("/")
        .http_only(true)
        .secure(state.session.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::minutes(10));

    (jar.add(cookie), Redirect::to(&auth_url))
}

/// Handles the OIDC callback after the user authenticates with the identity provider.
///
/// Success hands the access token to the browser in the URL fragment of the
/// post-login page. Any failure lands on the same page with an `error`
/// query parameter and writes nothing.
pub async fn callback(
    State(state): State<Arc<LoginState>>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Response {
    let result = complete_login(&state, &query, &jar).await;

    let remove_auth_state = Cookie::build((AUTH_STATE_COOKIE, ""))
        .path("/")
        .max_age(TimeDuration::ZERO);
    let jar = jar.add(remove_auth_state);

    let target = match result {
        Ok((user_id, access_token)) => {
            info!(user_id = %user_id, "login completed");
            handoff_url(&state.session.post_login_redirect, &access_token, user_id)
        }
        Err(e) => {
            warn!(error = %e, "login failed");
            let code = if e.is_credential_failure() {
                "authentication_failed"
            } else {
                "server_error"
            };
            failure_url(&state.session.post_login_redirect, code)
        }
    };

    (jar, Redirect::to(&target)).into_response()
}

async fn complete_login(
    state: &LoginState,
    query: &CallbackQuery,
    jar: &CookieJar,
) -> Result<(UserId, String), AuthenticationError> {
    if let Some(error) = &query.error {
        return Err(failed(format!(
            "provider returned {error}: {}",
            query.error_description.as_deref().unwrap_or("no description")
        )));
    }

    let auth_state = jar
        .get(AUTH_STATE_COOKIE)
        .and_then(|cookie| AuthState::from_cookie_value(cookie.value()))
        .ok_or_else(|| failed("missing or malformed auth state"))?;

    if query.state.as_deref() != Some(auth_state.csrf_token.as_str()) {
        return Err(failed("state mismatch"));
    }

    let code = query
        .code
        .as_deref()
        .ok_or_else(|| failed("callback without code"))?;

    let token_result = state
        .oidc
        .exchange_code(code, &auth_state)
        .await
        .map_err(|e| failed(e.to_string()))?;

    let profile = match &token_result.id_token {
        Some(id_token) => verify_id_token(&state.id_tokens, id_token, &auth_state.nonce).await?,
        None => state.profiles.fetch_profile(&token_result.access_token).await?,
    };

    let user_id = state.identity.upsert_from_idp(&profile).await?;
    Ok((user_id, token_result.access_token))
}

fn failed(reason: impl Into<String>) -> AuthenticationError {
    AuthenticationError::AuthenticationFailed {
        reason: reason.into(),
    }
}

fn handoff_url(base: &str, access_token: &str, user_id: UserId) -> String {
    let fragment = form_urlencoded::Serializer::new(String::new())
        .append_pair("access_token", access_token)
        .append_pair("token_type", "Bearer")
        .append_pair("user_id", &user_id.to_string())
        .finish();
    format!("{base}#{fragment}")
}

fn failure_url(base: &str, code: &str) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}error={code}")
}

/// Redirects to the provider's logout endpoint.
///
/// Best effort: the browser must drop its token whatever happens here.
pub async fn logout(State(state): State<Arc<LoginState>>, headers: HeaderMap) -> Response {
    let return_to = return_address(&headers, state.oidc.config().redirect_uri());

    match state.oidc.logout_url(&return_to) {
        Ok(url) => Redirect::to(&url).into_response(),
        Err(e) => {
            warn!(error = %e, "could not build logout URL");
            Redirect::to(&return_to).into_response()
        }
    }
}

/// Origin the provider sends the browser back to after logout, taken from
/// the request's `Host` and `X-Forwarded-Proto`. Falls back to the origin of
/// the configured redirect URI.
fn return_address(headers: &HeaderMap, redirect_uri: &str) -> String {
    let header_value = |name: header::HeaderName| headers.get(name).and_then(|v| v.to_str().ok());

    match header_value(header::HOST) {
        Some(host) => {
            let scheme = header_value(header::HeaderName::from_static("x-forwarded-proto"))
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or("http");
            format!("{scheme}://{host}")
        }
        None => reqwest::Url::parse(redirect_uri)
            .map(|url| url.origin().ascii_serialization())
            .unwrap_or_else(|_| "/".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn handoff_puts_token_in_fragment() {
        let url = handoff_url("/", "abc.def.ghi", UserId::new(42));
        assert_eq!(url, "/#access_token=abc.def.ghi&token_type=Bearer&user_id=42");
    }

    #[test]
    fn failure_appends_error_parameter() {
        assert_eq!(
            failure_url("/", "authentication_failed"),
            "/?error=authentication_failed"
        );
        assert_eq!(
            failure_url("/app?tab=1", "server_error"),
            "/app?tab=1&error=server_error"
        );
    }

    #[test]
    fn return_address_uses_forwarded_scheme_and_host() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("study.example.com"));
        assert_eq!(
            return_address(&headers, "http://localhost:3000/callback"),
            "http://study.example.com"
        );

        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert_eq!(
            return_address(&headers, "http://localhost:3000/callback"),
            "https://study.example.com"
        );
    }

    #[test]
    fn return_address_falls_back_to_redirect_origin() {
        assert_eq!(
            return_address(&HeaderMap::new(), "https://study.example.com/callback"),
            "https://study.example.com"
        );
    }
}
