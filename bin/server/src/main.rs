use greek_study_platform_access::{IdentityResolver, JwksCache, KeyStore, TokenVerifier};
use greek_study_server::{
    api::ApiState,
    auth::{LoginState, OidcClient, UserInfoClient},
    config::ServerConfig,
    db::{PgAnalysisRepository, PgUserRepository},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    // Create database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("failed to run migrations");

    // Initialize OIDC client
    tracing::info!("Discovering OIDC provider...");
    let oidc_config = config.oidc.clone();
    let oidc_client = OidcClient::discover(config.oidc)
        .await
        .expect("failed to discover OIDC provider");

    // Signing keys: fetched once up front, then on a timer
    let jwks = Arc::new(
        JwksCache::new(oidc_client.jwks_url(), oidc_config.jwks_min_refresh())
            .expect("failed to create key cache"),
    );
    if let Err(e) = jwks.warm().await {
        tracing::warn!(error = %e, "Initial signing key fetch failed; will retry on demand");
    }

    let refresh_cache = jwks.clone();
    let refresh_interval = oidc_config.jwks_refresh_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(refresh_interval);
        // The first tick completes immediately and the cache is already warm.
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(e) = refresh_cache.warm().await {
                tracing::warn!(error = %e, "Periodic signing key refresh failed");
            }
        }
    });

    let key_store: Arc<dyn KeyStore> = jwks;
    let verifier = TokenVerifier::from_config(&oidc_config, key_store.clone())
        .expect("invalid token settings");
    let id_tokens =
        TokenVerifier::for_id_tokens(&oidc_config, key_store).expect("invalid token settings");

    let profiles = Arc::new(
        UserInfoClient::new(oidc_client.userinfo_url()).expect("failed to create user-info client"),
    );
    let identity = IdentityResolver::new(Arc::new(PgUserRepository::new(db_pool.clone())));
    let analyses = Arc::new(PgAnalysisRepository::new(db_pool));

    // Create application state
    let api_state = Arc::new(ApiState::new(
        verifier,
        identity.clone(),
        analyses,
        profiles.clone(),
    ));
    let login_state = Arc::new(LoginState::new(
        oidc_client,
        id_tokens,
        identity,
        profiles,
        config.session,
    ));

    let app = greek_study_server::app(api_state, login_state, &config.static_dir);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.listen_addr);

    axum::serve(listener, app.into_make_service())
        .await
        .expect("server error");
}
