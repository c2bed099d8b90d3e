//! Claims carried by a verified bearer token.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The `aud` claim, which providers send as either a string or an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    /// Returns true if `audience` is one of the token's audiences.
    #[must_use]
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Self::Single(value) => value == audience,
            Self::Multiple(values) => values.iter().any(|v| v == audience),
        }
    }

    /// Iterates over all audiences.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let values: &[String] = match self {
            Self::Single(value) => std::slice::from_ref(value),
            Self::Multiple(values) => values,
        };
        values.iter().map(String::as_str)
    }
}

/// Claims of a token that passed verification.
///
/// Lives for one request. Recognized claims are typed fields; anything else
/// the provider adds is kept in `extra` and never interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedClaims {
    /// The `sub` claim: the provider's stable identifier for the end user.
    #[serde(rename = "sub")]
    pub subject: String,
    /// The `iss` claim.
    #[serde(rename = "iss")]
    pub issuer: String,
    /// The `aud` claim.
    #[serde(rename = "aud")]
    pub audience: Audience,
    /// The `exp` claim, seconds since the epoch.
    #[serde(rename = "exp")]
    pub expires_at: i64,
    /// The `iat` claim, seconds since the epoch.
    #[serde(rename = "iat")]
    pub issued_at: i64,
    /// Space-delimited granted scopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Unrecognized claims.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ValidatedClaims {
    /// Iterates over the granted scopes.
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scope.as_deref().unwrap_or_default().split_whitespace()
    }

    /// Returns true if `scope` was granted.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes().any(|s| s == scope)
    }
}
