//! User domain type and the provider profile it is built from.
//!
//! Users are identified externally by the provider's subject claim and
//! internally by a numeric `UserId` assigned by the store. Profile fields
//! are a cache of the provider's copy and are overwritten on every login.

use greek_study_core::UserId;
use serde::{Deserialize, Serialize};

/// An internal user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Internal user ID, assigned by the store.
    id: UserId,
    /// The provider's subject claim. Unique and never changed.
    subject: String,
    first_name: Option<String>,
    last_name: Option<String>,
    nickname: Option<String>,
    name: Option<String>,
    picture: Option<String>,
    email: Option<String>,
    email_verified: bool,
}

impl User {
    /// Builds a user from a stored id and the profile last written for it.
    #[must_use]
    pub fn from_profile(id: UserId, profile: IdpProfile) -> Self {
        Self {
            id,
            subject: profile.subject,
            first_name: profile.given_name,
            last_name: profile.family_name,
            nickname: profile.nickname,
            name: profile.name,
            picture: profile.picture,
            email: profile.email,
            email_verified: profile.email_verified,
        }
    }

    /// Creates a user with all fields specified.
    ///
    /// Use this when reconstituting a user from storage.
    #[must_use]
    #[expect(clippy::too_many_arguments)]
    pub fn with_all_fields(
        id: UserId,
        subject: String,
        first_name: Option<String>,
        last_name: Option<String>,
        nickname: Option<String>,
        name: Option<String>,
        picture: Option<String>,
        email: Option<String>,
        email_verified: bool,
    ) -> Self {
        Self {
            id,
            subject,
            first_name,
            last_name,
            nickname,
            name,
            picture,
            email,
            email_verified,
        }
    }

    /// Returns the internal user ID.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Returns the provider's subject claim.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn first_name(&self) -> Option<&str> {
        self.first_name.as_deref()
    }

    #[must_use]
    pub fn last_name(&self) -> Option<&str> {
        self.last_name.as_deref()
    }

    #[must_use]
    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    /// Returns the full display name, if the provider sent one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the avatar URL.
    #[must_use]
    pub fn picture(&self) -> Option<&str> {
        self.picture.as_deref()
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    #[must_use]
    pub fn email_verified(&self) -> bool {
        self.email_verified
    }
}

/// Profile returned by the provider's user-info endpoint.
///
/// Only `sub` is required; every display field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdpProfile {
    #[serde(rename = "sub")]
    pub subject: String,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
}

impl IdpProfile {
    /// Creates a profile carrying only a subject.
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            ..Self::default()
        }
    }
}
