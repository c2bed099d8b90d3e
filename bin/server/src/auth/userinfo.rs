//! Provider user-info client.

use async_trait::async_trait;
use greek_study_platform_access::{AuthenticationError, IdpProfile, ProfileSource};
use std::time::Duration;
use tracing::{instrument, warn};

/// Pause before the single retry of a failed transport.
const USERINFO_RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Timeout for one user-info call.
const USERINFO_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches profiles from the provider's user-info endpoint with the
/// caller's own access token.
#[derive(Debug, Clone)]
pub struct UserInfoClient {
    client: reqwest::Client,
    userinfo_url: String,
}

impl UserInfoClient {
    /// Creates a client for `userinfo_url`.
    pub fn new(userinfo_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(USERINFO_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            userinfo_url: userinfo_url.into(),
        })
    }

    async fn send(&self, access_token: &str) -> Result<reqwest::Response, reqwest::Error> {
        self.client
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
    }
}

#[async_trait]
impl ProfileSource for UserInfoClient {
    #[instrument(skip(self, access_token), fields(userinfo_url = %self.userinfo_url))]
    async fn fetch_profile(&self, access_token: &str) -> Result<IdpProfile, AuthenticationError> {
        let response = match self.send(access_token).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "user-info request failed, retrying once");
                tokio::time::sleep(USERINFO_RETRY_BACKOFF).await;
                self.send(access_token)
                    .await
                    .map_err(|e| AuthenticationError::ProviderUnavailable {
                        reason: e.to_string(),
                    })?
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "user-info request rejected");
            return Err(AuthenticationError::AuthenticationFailed {
                reason: format!("user-info endpoint returned HTTP {status}"),
            });
        }

        response
            .json::<IdpProfile>()
            .await
            .map_err(|e| AuthenticationError::AuthenticationFailed {
                reason: format!("malformed user-info response: {e}"),
            })
    }
}
