use axum::{
    Json, Router, middleware,
    routing::{get, post},
};
use notekeep_types::api::HealthResponse;

use crate::auth::{self, AuthState};
use crate::middleware::require_auth;
use crate::notes::{self, NotesState};

/// Auth service: public register/login/refresh plus the bearer-protected
/// `/auth/user` resource.
pub fn auth_router(state: AuthState) -> Router {
    let public = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh));

    let protected = Router::new()
        .route(
            "/auth/user",
            get(auth::get_user)
                .put(auth::update_user)
                .delete(auth::delete_user),
        )
        .layer(middleware::from_fn_with_state(
            state.tokens.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .route("/health", get(health))
        .with_state(state)
}

/// Notes service. Everything except `/health` requires an access token.
pub fn notes_router(state: NotesState) -> Router {
    let protected = Router::new()
        .route("/notes", post(notes::create_note).get(notes::list_notes))
        .route(
            "/notes/{id}",
            get(notes::get_note)
                .put(notes::update_note)
                .delete(notes::delete_note),
        )
        .layer(middleware::from_fn_with_state(
            state.tokens.clone(),
            require_auth,
        ));

    Router::new()
        .merge(protected)
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
    })
}
