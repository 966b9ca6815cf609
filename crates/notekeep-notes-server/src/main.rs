use std::sync::Arc;

use notekeep_api::cached_notes::CachedNotes;
use notekeep_api::config::{NotesConfig, RedisConfig};
use notekeep_api::notes::{NotesState, NotesStateInner};
use notekeep_api::routes::notes_router;
use notekeep_api::shutdown::shutdown_signal;
use notekeep_cache::{Cache, MemoryCache, RedisCache};
use notekeep_db::SqliteNoteStore;
use notekeep_token::TokenManager;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notekeep=debug,tower_http=debug".into()),
        )
        .init();

    let config = NotesConfig::from_env()?;
    info!(?config, "loaded notes service config");

    let store = Arc::new(SqliteNoteStore::open(&config.notes_db_path)?);
    let cache = open_cache(config.redis.as_ref()).await?;
    let tokens = Arc::new(TokenManager::new(config.token.clone())?);

    let state: NotesState = Arc::new(NotesStateInner {
        notes: CachedNotes::new(store, cache),
        tokens,
        db_timeout: config.server.db_timeout,
    });

    let app = notes_router(state.clone())
        .layer(TimeoutLayer::new(config.server.server_timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Notekeep notes service listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = state.notes.close().await {
        warn!("failed to close note store: {}", e);
    }
    info!("notes service stopped");

    Ok(())
}

async fn open_cache(redis: Option<&RedisConfig>) -> anyhow::Result<Arc<dyn Cache>> {
    match redis {
        Some(redis) => {
            let cache =
                RedisCache::connect(&redis.host, redis.port, redis.password.as_deref()).await?;
            info!(host = %redis.host, port = redis.port, "connected to Redis");
            Ok(Arc::new(cache))
        }
        None => {
            warn!("REDIS_HOST is not set; caching note lists in process memory");
            Ok(Arc::new(MemoryCache::new()))
        }
    }
}
