//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables.
//!
//! See [`OidcConfig`](greek_study_platform_access::OidcConfig) for the
//! identity provider settings (`OIDC__*`).

use greek_study_platform_access::OidcConfig;
use serde::Deserialize;
use std::path::PathBuf;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// Upper bound of the connection pool.
    #[serde(default = "default_database_max_connections")]
    pub database_max_connections: u32,

    /// Address the HTTP listener binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Directory holding the built frontend.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Login handshake configuration.
    #[serde(default)]
    pub session: SessionConfig,

    /// OIDC authentication configuration.
    pub oidc: OidcConfig,
}

fn default_database_max_connections() -> u32 {
    5
}

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("frontend")
}

/// Settings for the browser side of the login handshake.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Whether to set the Secure flag on the handshake cookie (requires HTTPS).
    /// Defaults to true; set to false for local HTTP development.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,

    /// Where the browser lands after the callback. Tokens travel in the
    /// URL fragment; failures add `?error=authentication_failed`.
    #[serde(default = "default_post_login_redirect")]
    pub post_login_redirect: String,
}

fn default_secure_cookies() -> bool {
    true
}

fn default_post_login_redirect() -> String {
    "/".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secure_cookies: default_secure_cookies(),
            post_login_redirect: default_post_login_redirect(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_source(config::Environment::default())
    }

    fn from_source(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(environment.separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn environment(vars: &[(&str, &str)]) -> config::Environment {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        config::Environment::default().source(Some(source))
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("DATABASE_URL", "postgres://localhost/greek"),
        ("OIDC__ISSUER_URL", "https://greek.auth.example.com/"),
        ("OIDC__CLIENT_ID", "client-abc"),
        ("OIDC__CLIENT_SECRET", "secret"),
        ("OIDC__REDIRECT_URI", "http://localhost:3000/callback"),
    ];

    #[test]
    fn session_config_has_correct_defaults() {
        let config = SessionConfig::default();
        assert!(config.secure_cookies);
        assert_eq!(config.post_login_redirect, "/");
    }

    #[test]
    fn loads_required_values_and_defaults() {
        let config = ServerConfig::from_source(environment(REQUIRED)).expect("config");

        assert_eq!(config.database_url, "postgres://localhost/greek");
        assert_eq!(config.listen_addr, "127.0.0.1:3000");
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.static_dir, PathBuf::from("frontend"));
        assert_eq!(config.oidc.client_id(), "client-abc");
        assert_eq!(config.oidc.clock_skew().as_secs(), 60);
    }

    #[test]
    fn nested_overrides_are_parsed() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("OIDC__CLOCK_SKEW_SECONDS", "5"));
        vars.push(("OIDC__AUDIENCES", "https://greek-study-tool/api"));
        vars.push(("SESSION__SECURE_COOKIES", "false"));

        let config = ServerConfig::from_source(environment(&vars)).expect("config");

        assert_eq!(config.oidc.clock_skew().as_secs(), 5);
        assert_eq!(
            config.oidc.accepted_audiences(),
            vec!["https://greek-study-tool/api".to_string()]
        );
        assert!(!config.session.secure_cookies);
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let vars: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "DATABASE_URL")
            .collect();
        assert!(ServerConfig::from_source(environment(&vars)).is_err());
    }
}
