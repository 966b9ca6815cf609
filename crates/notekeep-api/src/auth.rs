use std::sync::Arc;
use std::time::Duration;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use notekeep_db::{StoreError, UserStore};
use notekeep_token::TokenManager;
use notekeep_types::api::{
    LoginRequest, LoginResponse, MessageResponse, RefreshRequest, RefreshResponse,
    RegisterRequest, RegisterResponse, UpdateUserRequest, UserResponse,
};
use notekeep_types::deadline::Deadline;
use notekeep_types::models::UserChanges;
use tracing::info;

use crate::error::{
    ApiError, MSG_LOGIN_SUCCESSFUL, MSG_TOKENS_REFRESHED, MSG_USER_DELETED, MSG_USER_REGISTERED,
    MSG_USER_UPDATED,
};
use crate::extract::{CurrentUser, JsonBody};
use crate::timeout::store_call;

pub type AuthState = Arc<AuthStateInner>;

pub struct AuthStateInner {
    pub users: Arc<dyn UserStore>,
    pub tokens: Arc<TokenManager>,
    pub db_timeout: Duration,
}

impl AuthStateInner {
    fn deadline(&self) -> Deadline {
        Deadline::after(self.db_timeout)
    }
}

pub async fn register(
    State(state): State<AuthState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(ApiError::InvalidUserData);
    }

    let deadline = state.deadline();
    let user = store_call(&deadline, state.users.create(&req.username, &req.password))
        .await
        .map_err(|e| match e {
            StoreError::AlreadyExists => ApiError::UserAlreadyExists,
            StoreError::InvalidData(_) => ApiError::InvalidUserData,
            e @ StoreError::Timeout => ApiError::database(e),
            other => ApiError::UserCreation(other.to_string()),
        })?;

    info!(user_id = user.id, "registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: MSG_USER_REGISTERED.into(),
            user: user.redacted(),
        }),
    ))
}

pub async fn login(
    State(state): State<AuthState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(ApiError::InvalidData(
            "username and password are required".into(),
        ));
    }

    let deadline = state.deadline();
    let user = store_call(&deadline, state.users.authenticate(&req.username, &req.password))
        .await
        .map_err(|e| match e {
            StoreError::InvalidCredentials | StoreError::NotFound => ApiError::InvalidCredentials,
            other => ApiError::database(other),
        })?;

    let pair = state
        .tokens
        .issue(user.id)
        .map_err(|e| ApiError::TokenGeneration(e.to_string()))?;

    Ok(Json(LoginResponse {
        message: MSG_LOGIN_SUCCESSFUL.into(),
        user: user.redacted(),
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

/// Trade a refresh token for a fresh pair. The user must still exist.
pub async fn refresh(
    State(state): State<AuthState>,
    JsonBody(req): JsonBody<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.refresh_token.is_empty() {
        return Err(ApiError::InvalidData("refresh_token is required".into()));
    }

    let user_id = state
        .tokens
        .validate_refresh(&req.refresh_token)
        .map_err(ApiError::InvalidRefreshToken)?;

    let deadline = state.deadline();
    let user = store_call(&deadline, state.users.read(user_id))
        .await
        .map_err(|e| match e {
            StoreError::NotFound => ApiError::UserNotFound,
            other => ApiError::database(other),
        })?;

    let pair = state
        .tokens
        .issue(user.id)
        .map_err(|e| ApiError::TokenGeneration(e.to_string()))?;

    Ok(Json(RefreshResponse {
        message: MSG_TOKENS_REFRESHED.into(),
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

pub async fn get_user(
    State(state): State<AuthState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let deadline = state.deadline();
    let user = store_call(&deadline, state.users.read(user_id))
        .await
        .map_err(not_found_as_user)?;

    Ok(Json(UserResponse {
        message: None,
        user: user.redacted(),
    }))
}

/// Sparse update: empty fields are left alone. An all-empty body changes
/// nothing and still answers with the current user.
pub async fn update_user(
    State(state): State<AuthState>,
    CurrentUser(user_id): CurrentUser,
    JsonBody(req): JsonBody<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let changes = UserChanges::from_fields(req.username, req.password);

    let deadline = state.deadline();
    store_call(&deadline, state.users.update(user_id, changes))
        .await
        .map_err(|e| match e {
            StoreError::AlreadyExists => ApiError::UserAlreadyExists,
            other => not_found_as_user(other),
        })?;

    let user = store_call(&deadline, state.users.read(user_id))
        .await
        .map_err(not_found_as_user)?;

    Ok(Json(UserResponse {
        message: Some(MSG_USER_UPDATED.into()),
        user: user.redacted(),
    }))
}

pub async fn delete_user(
    State(state): State<AuthState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let deadline = state.deadline();
    store_call(&deadline, state.users.delete(user_id))
        .await
        .map_err(not_found_as_user)?;

    info!(user_id, "account deleted");
    Ok(Json(MessageResponse {
        message: MSG_USER_DELETED.into(),
    }))
}

fn not_found_as_user(err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound => ApiError::UserNotFound,
        other => ApiError::database(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use notekeep_token::TokenConfig;
    use notekeep_types::models::User;

    struct StalledUsers;

    async fn stall<T>() -> Result<T, StoreError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(StoreError::NotFound)
    }

    #[async_trait]
    impl UserStore for StalledUsers {
        async fn create(&self, _username: &str, _password: &str) -> Result<User, StoreError> {
            stall().await
        }
        async fn read(&self, _id: i64) -> Result<User, StoreError> {
            stall().await
        }
        async fn find_by_username(&self, _username: &str) -> Result<User, StoreError> {
            stall().await
        }
        async fn update(&self, _id: i64, _changes: UserChanges) -> Result<(), StoreError> {
            stall().await
        }
        async fn delete(&self, _id: i64) -> Result<(), StoreError> {
            stall().await
        }
        async fn authenticate(&self, _username: &str, _password: &str) -> Result<User, StoreError> {
            stall().await
        }
        async fn close(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn register_timeout_is_a_database_failure() {
        let tokens = TokenManager::new(TokenConfig {
            secret: "test-secret".into(),
            access_expiration_hours: 1,
            refresh_expiration_hours: 24,
        })
        .unwrap();
        let state = Arc::new(AuthStateInner {
            users: Arc::new(StalledUsers),
            tokens: Arc::new(tokens),
            db_timeout: Duration::from_secs(5),
        });
        let req = RegisterRequest {
            username: "alice".into(),
            password: "pw".into(),
        };

        let Err(err) = register(State(state), JsonBody(req)).await else {
            panic!("register should time out");
        };
        assert!(matches!(err, ApiError::DatabaseOperation(_)));
    }
}
