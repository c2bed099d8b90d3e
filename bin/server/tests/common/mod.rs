//! Shared fixtures for router tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::extract::State;
use axum::http::{Request, Response, header};
use axum::routing::{get, post};
use axum::{Json, Router};
use greek_study_analysis::MemoryAnalysisStore;
use greek_study_core::{StoreError, UserId};
use greek_study_platform_access::testing::{TEST_JWKS_JSON, sign, test_key_store};
use greek_study_platform_access::{
    AuthenticationError, IdentityResolver, IdpProfile, ProfileSource, TokenVerifier, User,
    UserStore,
};
use greek_study_server::api::{self, ApiState};
use jsonwebtoken::Algorithm;
use rootcause::prelude::Report;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower::ServiceExt;

pub const ISSUER: &str = "https://greek.auth.example.com/";
pub const AUDIENCE: &str = "https://greek-study-tool/api";

/// User store keyed by subject.
#[derive(Default)]
pub struct MemoryUsers {
    rows: Mutex<HashMap<String, User>>,
}

impl MemoryUsers {
    pub async fn count(&self) -> usize {
        self.rows.lock().await.len()
    }
}

#[async_trait]
impl UserStore for MemoryUsers {
    async fn upsert_from_profile(&self, profile: &IdpProfile) -> Result<UserId, Report<StoreError>> {
        let mut rows = self.rows.lock().await;
        let next = UserId::new(i64::try_from(rows.len()).unwrap_or(0) + 1);
        let id = rows.get(&profile.subject).map_or(next, User::id);
        rows.insert(
            profile.subject.clone(),
            User::from_profile(id, profile.clone()),
        );
        Ok(id)
    }

    async fn find_id_by_subject(&self, subject: &str) -> Result<Option<UserId>, Report<StoreError>> {
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

/// Profile source answering from a fixed token-to-profile map.
#[derive(Default)]
pub struct FakeProfiles {
    profiles: std::sync::Mutex<HashMap<String, IdpProfile>>,
}

impl FakeProfiles {
    pub fn insert(&self, token: &str, profile: IdpProfile) {
        if let Ok(mut profiles) = self.profiles.lock() {
            profiles.insert(token.to_string(), profile);
        }
    }
}

#[async_trait]
impl ProfileSource for FakeProfiles {
    async fn fetch_profile(&self, access_token: &str) -> Result<IdpProfile, AuthenticationError> {
        self.profiles
            .lock()
            .ok()
            .and_then(|profiles| profiles.get(access_token).cloned())
            .ok_or_else(|| AuthenticationError::AuthenticationFailed {
                reason: "user-info endpoint returned HTTP 401".to_string(),
            })
    }
}

/// Everything a router test needs to poke at.
pub struct TestApp {
    pub router: Router,
    pub users: Arc<MemoryUsers>,
    pub profiles: Arc<FakeProfiles>,
    pub identity: IdentityResolver,
}

impl TestApp {
    pub fn new() -> Self {
        let users = Arc::new(MemoryUsers::default());
        let profiles = Arc::new(FakeProfiles::default());
        let identity = IdentityResolver::new(users.clone());
        let verifier = TokenVerifier::new(
            Arc::new(test_key_store()),
            ISSUER.to_string(),
            vec![AUDIENCE.to_string()],
            Algorithm::RS256,
            Duration::from_secs(60),
        );
        let state = Arc::new(ApiState::new(
            verifier,
            identity.clone(),
            Arc::new(MemoryAnalysisStore::new()),
            profiles.clone(),
        ));

        Self {
            router: api::router(state),
            users,
            profiles,
            identity,
        }
    }

    /// Creates an account for `subject` and returns a token for it.
    pub async fn login(&self, subject: &str) -> (UserId, String) {
        let profile = IdpProfile {
            name: Some(format!("{subject} name")),
            nickname: Some(subject.to_string()),
            ..IdpProfile::new(subject)
        };
        let id = self
            .identity
            .upsert_from_idp(&profile)
            .await
            .expect("upsert");
        (id, token_for(subject))
    }

    pub async fn send(&self, request: Request<Body>) -> (u16, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("response");
        read_json(response).await
    }
}

/// Access token the local provider hands out on every code exchange.
pub const PROVIDER_ACCESS_TOKEN: &str = "provider-access-token";

type PendingIdToken = Arc<std::sync::Mutex<Option<String>>>;

/// Local provider serving the token and JWKS endpoints.
///
/// The JWKS publishes the test key. The token endpoint answers every code
/// with [`PROVIDER_ACCESS_TOKEN`] and whatever ID token was last queued.
pub struct LocalProvider {
    pub base_url: String,
    id_token: PendingIdToken,
    _shutdown: tokio::sync::oneshot::Sender<()>,
}

impl LocalProvider {
    pub async fn start() -> Self {
        let id_token = PendingIdToken::default();
        let app = Router::new()
            .route("/oauth/token", post(issue_tokens))
            .route(
                "/jwks",
                get(|| async { ([(header::CONTENT_TYPE, "application/json")], TEST_JWKS_JSON) }),
            )
            .with_state(id_token.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = rx.await;
                })
                .await;
        });

        Self {
            base_url: format!("http://{addr}"),
            id_token,
            _shutdown: tx,
        }
    }

    /// Queues the ID token returned by the next code exchange.
    pub fn queue_id_token(&self, token: String) {
        if let Ok(mut pending) = self.id_token.lock() {
            *pending = Some(token);
        }
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth/token", self.base_url)
    }

    pub fn jwks_url(&self) -> String {
        format!("{}/jwks", self.base_url)
    }
}

async fn issue_tokens(State(id_token): State<PendingIdToken>) -> Json<Value> {
    let mut body = json!({
        "access_token": PROVIDER_ACCESS_TOKEN,
        "token_type": "Bearer",
        "expires_in": 3600
    });
    if let Some(token) = id_token.lock().ok().and_then(|pending| pending.clone()) {
        body["id_token"] = Value::String(token);
    }
    Json(body)
}

pub fn token_for(subject: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    sign(&json!({
        "sub": subject,
        "iss": ISSUER,
        "aud": [AUDIENCE],
        "exp": now + 3600,
        "iat": now,
        "scope": "openid profile email"
    }))
}

pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

pub async fn read_json(response: Response<Body>) -> (u16, Value) {
    let status = response.status().as_u16();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}
