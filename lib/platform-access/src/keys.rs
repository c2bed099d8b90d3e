//! Signing-key cache for bearer token verification.
//!
//! The provider publishes its public keys as a JWKS document. `JwksCache`
//! keeps the current set in memory, indexed by key id, and replaces it as a
//! whole on refresh: readers clone an `Arc` to a complete `KeySet` and never
//! observe a set that is half old and half new.
//!
//! Forced refreshes (a token names a key id the cache has never seen) are
//! rate-limited by a minimum interval so that a stream of forged key ids
//! cannot turn this service into a load amplifier against the provider.

use crate::error::KeyCacheError;
use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::jwk::{JwkSet, PublicKeyUse};
use rootcause::prelude::Report;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

/// Timeout for key-set HTTP fetches.
const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause before the single retry of a failed fetch.
const JWKS_RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// A public verification key and the id it is published under.
#[derive(Clone)]
pub struct SigningKey {
    kid: String,
    key: DecodingKey,
}

impl SigningKey {
    /// Creates a key entry.
    #[must_use]
    pub fn new(kid: String, key: DecodingKey) -> Self {
        Self { kid, key }
    }

    /// Returns the key id.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Returns the decoding key.
    #[must_use]
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.key
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey").field("kid", &self.kid).finish()
    }
}

/// An immutable set of signing keys indexed by key id.
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    keys: HashMap<String, SigningKey>,
}

impl KeySet {
    /// Builds a key set from a JWKS document.
    ///
    /// Keys without a `kid`, encryption keys, and keys that cannot be turned
    /// into a decoding key are skipped.
    #[must_use]
    pub fn from_jwks(jwk_set: &JwkSet) -> Self {
        let mut keys = HashMap::new();
        for jwk in &jwk_set.keys {
            let Some(kid) = &jwk.common.key_id else {
                continue;
            };
            if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
                debug!(kid = kid.as_str(), "skipping encryption key");
                continue;
            }
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    keys.insert(kid.clone(), SigningKey::new(kid.clone(), key));
                }
                Err(e) => {
                    debug!(kid = kid.as_str(), error = %e, "skipping unusable JWK");
                }
            }
        }
        Self { keys }
    }

    /// Looks up a key by id.
    #[must_use]
    pub fn get(&self, kid: &str) -> Option<&SigningKey> {
        self.keys.get(kid)
    }

    /// Returns the number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if the set holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// What a forced refresh did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new key set was fetched and swapped in.
    Refreshed { key_count: usize },
    /// The minimum interval has not elapsed; nothing was fetched.
    Throttled,
}

/// Source of signing keys for the token verifier.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Returns the key published under `kid`, if currently known.
    async fn get_key(&self, kid: &str) -> Option<SigningKey>;

    /// Attempts to replace the key set with a fresh copy.
    async fn refresh(&self) -> Result<RefreshOutcome, Report<KeyCacheError>>;
}

/// A fixed key set that never refreshes.
///
/// Used where keys are provisioned out of band, and in tests.
#[derive(Debug, Clone)]
pub struct StaticKeySet {
    keys: Arc<KeySet>,
}

impl StaticKeySet {
    /// Wraps a key set.
    #[must_use]
    pub fn new(keys: KeySet) -> Self {
        Self {
            keys: Arc::new(keys),
        }
    }
}

#[async_trait]
impl KeyStore for StaticKeySet {
    async fn get_key(&self, kid: &str) -> Option<SigningKey> {
        self.keys.get(kid).cloned()
    }

    async fn refresh(&self) -> Result<RefreshOutcome, Report<KeyCacheError>> {
        Ok(RefreshOutcome::Throttled)
    }
}

/// Key cache backed by the provider's JWKS endpoint.
pub struct JwksCache {
    client: reqwest::Client,
    jwks_url: String,
    min_refresh_interval: Duration,
    keys: RwLock<Arc<KeySet>>,
    /// When the last fetch started. Held across the fetch so concurrent
    /// refreshers queue behind it and then see the fresh stamp.
    last_fetch: Mutex<Option<Instant>>,
}

impl JwksCache {
    /// Creates an empty cache. Call [`JwksCache::warm`] before serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        jwks_url: String,
        min_refresh_interval: Duration,
    ) -> Result<Self, Report<KeyCacheError>> {
        let client = reqwest::Client::builder()
            .timeout(JWKS_FETCH_TIMEOUT)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| KeyCacheError::Client {
                details: e.to_string(),
            })?;

        Ok(Self {
            client,
            jwks_url,
            min_refresh_interval,
            keys: RwLock::new(Arc::new(KeySet::default())),
            last_fetch: Mutex::new(None),
        })
    }

    /// Returns the JWKS endpoint this cache reads.
    #[must_use]
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Fetches the key set unconditionally.
    ///
    /// Used at startup and by the timed background refresh.
    ///
    /// # Errors
    ///
    /// Returns an error if the key set cannot be fetched or parsed; the
    /// previously cached set stays in place.
    pub async fn warm(&self) -> Result<usize, Report<KeyCacheError>> {
        let mut last_fetch = self.last_fetch.lock().await;
        *last_fetch = Some(Instant::now());
        self.fetch_and_swap().await
    }

    /// Returns a snapshot of the current key set.
    pub async fn snapshot(&self) -> Arc<KeySet> {
        self.keys.read().await.clone()
    }

    async fn fetch_and_swap(&self) -> Result<usize, Report<KeyCacheError>> {
        let jwk_set = self.fetch_with_retry().await?;
        let fresh = Arc::new(KeySet::from_jwks(&jwk_set));
        let key_count = fresh.len();
        *self.keys.write().await = fresh;
        info!(jwks_url = self.jwks_url.as_str(), key_count, "signing keys refreshed");
        Ok(key_count)
    }

    async fn fetch_with_retry(&self) -> Result<JwkSet, Report<KeyCacheError>> {
        match self.fetch_jwks().await {
            Err(KeyCacheError::FetchFailed { error, .. }) => {
                warn!(
                    jwks_url = self.jwks_url.as_str(),
                    error = error.as_str(),
                    "key set fetch failed, retrying once"
                );
                tokio::time::sleep(JWKS_RETRY_BACKOFF).await;
                Ok(self.fetch_jwks().await?)
            }
            other => Ok(other?),
        }
    }

    async fn fetch_jwks(&self) -> Result<JwkSet, KeyCacheError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| KeyCacheError::FetchFailed {
                url: self.jwks_url.clone(),
                error: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(KeyCacheError::FetchFailed {
                url: self.jwks_url.clone(),
                error: format!("HTTP {}", response.status()),
            });
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| KeyCacheError::ParseFailed {
                url: self.jwks_url.clone(),
                error: e.to_string(),
            })
    }
}

#[async_trait]
impl KeyStore for JwksCache {
    async fn get_key(&self, kid: &str) -> Option<SigningKey> {
        self.keys.read().await.get(kid).cloned()
    }

    #[instrument(skip(self), fields(jwks_url = %self.jwks_url))]
    async fn refresh(&self) -> Result<RefreshOutcome, Report<KeyCacheError>> {
        let mut last_fetch = self.last_fetch.lock().await;
        if let Some(started) = *last_fetch
            && started.elapsed() < self.min_refresh_interval
        {
            debug!("forced key refresh throttled");
            return Ok(RefreshOutcome::Throttled);
        }
        // Stamped before fetching so failures are throttled too.
        *last_fetch = Some(Instant::now());
        let key_count = self.fetch_and_swap().await?;
        Ok(RefreshOutcome::Refreshed { key_count })
    }
}

impl std::fmt::Debug for JwksCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksCache")
            .field("jwks_url", &self.jwks_url)
            .field("min_refresh_interval", &self.min_refresh_interval)
            .finish()
    }
}
