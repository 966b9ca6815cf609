#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use notekeep_api::auth::AuthStateInner;
use notekeep_api::cached_notes::CachedNotes;
use notekeep_api::notes::NotesStateInner;
use notekeep_api::routes::{auth_router, notes_router};
use notekeep_cache::MemoryCache;
use notekeep_db::{SqliteNoteStore, SqliteUserStore};
use notekeep_token::{Clock, ManualClock, TokenConfig, TokenManager};
use serde_json::Value;
use tower::ServiceExt;

pub const SECRET: &str = "integration-test-secret";
pub const START: i64 = 1_700_000_000;

pub fn token_config() -> TokenConfig {
    TokenConfig {
        secret: SECRET.into(),
        access_expiration_hours: 1,
        refresh_expiration_hours: 24,
    }
}

/// Both services wired to their own in-memory stores but one token
/// configuration and one clock.
pub struct Services {
    pub auth: Router,
    pub notes: Router,
    pub clock: Arc<ManualClock>,
    pub cache: Arc<MemoryCache>,
}

impl Services {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new(START));
        let shared: Arc<dyn Clock> = clock.clone();

        // Separate managers built from the same config, as in production.
        let auth_tokens = Arc::new(TokenManager::with_clock(token_config(), shared.clone()).unwrap());
        let notes_tokens = Arc::new(TokenManager::with_clock(token_config(), shared).unwrap());

        let auth = auth_router(Arc::new(AuthStateInner {
            users: Arc::new(SqliteUserStore::in_memory().unwrap()),
            tokens: auth_tokens,
            db_timeout: Duration::from_secs(5),
        }));

        let cache = Arc::new(MemoryCache::new());
        let notes = notes_router(Arc::new(NotesStateInner {
            notes: CachedNotes::new(Arc::new(SqliteNoteStore::in_memory().unwrap()), cache.clone()),
            tokens: notes_tokens,
            db_timeout: Duration::from_secs(5),
        }));

        Self {
            auth,
            notes,
            clock,
            cache,
        }
    }

    /// Register and log in, returning `(user_id, access, refresh)`.
    pub async fn sign_up(&self, username: &str, password: &str) -> (i64, String, String) {
        let body = serde_json::json!({ "username": username, "password": password });
        let (status, _) = call(&self.auth, Method::POST, "/auth/register", None, Some(body.clone())).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, login) = call(&self.auth, Method::POST, "/auth/login", None, Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        (
            login["user"]["id"].as_i64().unwrap(),
            login["access_token"].as_str().unwrap().to_string(),
            login["refresh_token"].as_str().unwrap().to_string(),
        )
    }
}

pub async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    send(app, builder.body(body).unwrap()).await
}

/// Send a prebuilt request. Empty bodies come back as `Value::Null`.
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}
