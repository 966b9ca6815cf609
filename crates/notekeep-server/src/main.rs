use std::sync::Arc;

use notekeep_api::auth::{AuthState, AuthStateInner};
use notekeep_api::config::AuthConfig;
use notekeep_api::routes::auth_router;
use notekeep_api::shutdown::shutdown_signal;
use notekeep_db::{SqliteUserStore, UserStore};
use notekeep_token::TokenManager;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notekeep=debug,tower_http=debug".into()),
        )
        .init();

    let config = AuthConfig::from_env()?;
    info!(?config, "loaded auth service config");

    let users = Arc::new(SqliteUserStore::open(&config.users_db_path)?);
    let tokens = Arc::new(TokenManager::new(config.token.clone())?);

    let state: AuthState = Arc::new(AuthStateInner {
        users: users.clone(),
        tokens,
        db_timeout: config.server.db_timeout,
    });

    let app = auth_router(state)
        .layer(TimeoutLayer::new(config.server.server_timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Notekeep auth service listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = users.close().await {
        warn!("failed to close user store: {}", e);
    }
    info!("auth service stopped");

    Ok(())
}
