//! Mapping between provider identities and internal users.

use crate::error::AuthenticationError;
use crate::user::{IdpProfile, User};
use async_trait::async_trait;
use greek_study_core::{StoreError, UserId};
use rootcause::prelude::Report;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Persistence for user records.
///
/// Implementations must make `upsert_from_profile` a single atomic
/// insert-or-update keyed on the unique subject, so that concurrent first
/// logins for one subject converge on one row.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Creates the user for `profile.subject`, or overwrites every profile
    /// field of the existing one. Returns the internal id either way.
    async fn upsert_from_profile(&self, profile: &IdpProfile) -> Result<UserId, Report<StoreError>>;

    /// Returns the internal id for a subject, if that subject ever logged in.
    async fn find_id_by_subject(&self, subject: &str) -> Result<Option<UserId>, Report<StoreError>>;

    /// Returns a user record by internal id.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, Report<StoreError>>;
}

/// Source of provider profiles, fetched with the caller's access token.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Fetches the profile the provider holds for the token's subject.
    async fn fetch_profile(&self, access_token: &str) -> Result<IdpProfile, AuthenticationError>;
}

/// Finds or creates internal users for provider identities.
#[derive(Clone)]
pub struct IdentityResolver {
    users: Arc<dyn UserStore>,
}

impl IdentityResolver {
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Records a completed login and returns the internal user id.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationFailed` for a profile without a subject and
    /// `Storage` when the store fails.
    #[instrument(skip(self, profile), fields(subject = %profile.subject))]
    pub async fn upsert_from_idp(&self, profile: &IdpProfile) -> Result<UserId, AuthenticationError> {
        if profile.subject.trim().is_empty() {
            warn!("provider profile has no subject");
            return Err(AuthenticationError::AuthenticationFailed {
                reason: "profile has no subject".to_string(),
            });
        }

        let id = self.users.upsert_from_profile(profile).await.map_err(|report| {
            error!(error = %report, "user upsert failed");
            AuthenticationError::Storage {
                details: report.current_context().to_string(),
            }
        })?;

        info!(user_id = %id, "user upserted from provider profile");
        Ok(id)
    }

    /// Resolves a verified subject to its internal user id.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if the subject never completed a login and
    /// `Storage` when the store fails.
    pub async fn resolve_by_subject(&self, subject: &str) -> Result<UserId, AuthenticationError> {
        match self.users.find_id_by_subject(subject).await {
            Ok(Some(id)) => Ok(id),
            Ok(None) => Err(AuthenticationError::UserNotFound {
                subject: subject.to_string(),
            }),
            Err(report) => {
                error!(subject, error = %report, "user lookup failed");
                Err(AuthenticationError::Storage {
                    details: report.current_context().to_string(),
                })
            }
        }
    }

    /// Returns the user record for an internal id.
    ///
    /// # Errors
    ///
    /// Returns the store failure.
    pub async fn find_user(&self, id: UserId) -> Result<Option<User>, Report<StoreError>> {
        self.users.find_by_id(id).await
    }
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct MemoryUsers {
        rows: Mutex<HashMap<String, User>>,
        fail: bool,
    }

    #[async_trait]
    impl UserStore for MemoryUsers {
        async fn upsert_from_profile(
            &self,
            profile: &IdpProfile,
        ) -> Result<UserId, Report<StoreError>> {
            if self.fail {
                return Err(StoreError::Database {
                    details: "pool timed out".to_string(),
                }
                .into());
            }
            let mut rows = self.rows.lock().await;
            let next = UserId::new(i64::try_from(rows.len()).unwrap_or(0) + 1);
            let id = rows.get(&profile.subject).map_or(next, User::id);
            rows.insert(
                profile.subject.clone(),
                User::from_profile(id, profile.clone()),
            );
            Ok(id)
        }

        async fn find_id_by_subject(
            &self,
            subject: &str,
        ) -> Result<Option<UserId>, Report<StoreError>> {
            if self.fail {
                return Err(StoreError::Database {
                    details: "pool timed out".to_string(),
                }
                .into());
            }
            Ok(self.rows.lock().await.get(subject).map(User::id))
        }

        async fn find_by_id(&self, id: UserId) -> Result<Option<User>, Report<StoreError>> {
            Ok(self
                .rows
                .lock()
                .await
                .values()
                .find(|u| u.id() == id)
                .cloned())
        }
    }

    fn resolver() -> (IdentityResolver, Arc<MemoryUsers>) {
        let users = Arc::new(MemoryUsers::default());
        (IdentityResolver::new(users.clone()), users)
    }

    #[tokio::test]
    async fn first_login_creates_user_resolvable_by_subject() {
        let (resolver, _) = resolver();
        let profile = IdpProfile {
            name: Some("A. User".to_string()),
            email: Some("a@x.com".to_string()),
            ..IdpProfile::new("sub-123")
        };

        let id = resolver.upsert_from_idp(&profile).await.expect("upsert");

        assert_eq!(resolver.resolve_by_subject("sub-123").await, Ok(id));
        let user = resolver.find_user(id).await.expect("find").expect("user");
        assert_eq!(user.name(), Some("A. User"));
    }

    #[tokio::test]
    async fn repeated_login_keeps_id_and_overwrites_profile() {
        let (resolver, users) = resolver();
        let first = resolver
            .upsert_from_idp(&IdpProfile {
                nickname: Some("old".to_string()),
                ..IdpProfile::new("sub-123")
            })
            .await
            .expect("first");
        let second = resolver
            .upsert_from_idp(&IdpProfile::new("sub-123"))
            .await
            .expect("second");

        assert_eq!(first, second);
        let rows = users.rows.lock().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows["sub-123"].nickname(), None);
    }

    #[tokio::test]
    async fn unknown_subject_is_user_not_found() {
        let (resolver, _) = resolver();
        assert_eq!(
            resolver.resolve_by_subject("never-logged-in").await,
            Err(AuthenticationError::UserNotFound {
                subject: "never-logged-in".to_string()
            })
        );
    }

    #[tokio::test]
    async fn empty_subject_is_rejected_without_writing() {
        let (resolver, users) = resolver();
        let err = resolver
            .upsert_from_idp(&IdpProfile::new("  "))
            .await
            .expect_err("empty subject");

        assert!(matches!(err, AuthenticationError::AuthenticationFailed { .. }));
        assert!(users.rows.lock().await.is_empty());
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_storage_error() {
        let resolver = IdentityResolver::new(Arc::new(MemoryUsers {
            fail: true,
            ..MemoryUsers::default()
        }));

        let err = resolver
            .resolve_by_subject("sub-123")
            .await
            .expect_err("store down");
        assert!(matches!(err, AuthenticationError::Storage { .. }));
        assert!(!err.is_credential_failure());
    }
}
