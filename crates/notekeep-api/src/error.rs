use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use notekeep_db::StoreError;
use notekeep_token::TokenError;
use notekeep_types::api::ErrorResponse;
use thiserror::Error;
use tracing::{debug, error};

pub const MSG_USER_REGISTERED: &str = "User registered successfully";
pub const MSG_LOGIN_SUCCESSFUL: &str = "Login successful";
pub const MSG_TOKENS_REFRESHED: &str = "Tokens refreshed successfully";
pub const MSG_USER_UPDATED: &str = "User updated successfully";
pub const MSG_USER_DELETED: &str = "User deleted successfully";
pub const MSG_NOTE_CREATED: &str = "Note created successfully";
pub const MSG_NOTE_RETRIEVED: &str = "Note retrieved successfully";
pub const MSG_NOTE_UPDATED: &str = "Note updated successfully";
pub const MSG_NOTE_DELETED: &str = "Note deleted successfully";
pub const MSG_NOTES_RETRIEVED: &str = "Notes retrieved successfully";

/// Every failure a handler or the bearer interceptor can surface.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request data: {0}")]
    InvalidData(String),

    #[error("invalid user data")]
    InvalidUserData,

    #[error("invalid note id {0:?}")]
    InvalidNoteId(String),

    #[error("authorization header is missing")]
    MissingAuthHeader,

    #[error("authorization header is not a bearer token")]
    InvalidAuthFormat,

    #[error("access token rejected: {0}")]
    InvalidToken(#[source] TokenError),

    #[error("refresh token rejected: {0}")]
    InvalidRefreshToken(#[source] TokenError),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("no authenticated user on the request")]
    MissingUserId,

    #[error("caller does not own the resource")]
    Forbidden,

    #[error("user not found")]
    UserNotFound,

    #[error("note not found")]
    NoteNotFound,

    #[error("username already taken")]
    UserAlreadyExists,

    #[error("failed to create user: {0}")]
    UserCreation(String),

    #[error("failed to create note: {0}")]
    NoteCreation(String),

    #[error("failed to update note: {0}")]
    NoteUpdate(String),

    #[error("failed to delete note: {0}")]
    NoteDeletion(String),

    #[error("database operation failed: {0}")]
    DatabaseOperation(String),

    #[error("failed to generate tokens: {0}")]
    TokenGeneration(String),
}

impl ApiError {
    /// Fallback for store failures that have no more specific mapping.
    pub fn database(err: StoreError) -> Self {
        Self::DatabaseOperation(err.to_string())
    }

    pub fn status(&self) -> StatusCode {
        self.parts().0
    }

    /// Status, public message and optional details.
    fn parts(&self) -> (StatusCode, &'static str, Option<String>) {
        match self {
            Self::InvalidData(details) => (
                StatusCode::BAD_REQUEST,
                "invalid request data",
                Some(details.clone()),
            ),
            Self::InvalidUserData => (StatusCode::BAD_REQUEST, "invalid user data", None),
            Self::InvalidNoteId(_) => (StatusCode::BAD_REQUEST, "invalid note id", None),
            Self::MissingAuthHeader | Self::InvalidAuthFormat => (
                StatusCode::UNAUTHORIZED,
                "token is missing or malformed",
                None,
            ),
            Self::InvalidToken(_) => (
                StatusCode::UNAUTHORIZED,
                "invalid or expired token",
                None,
            ),
            Self::InvalidRefreshToken(_) => (
                StatusCode::UNAUTHORIZED,
                "invalid or expired refresh token",
                None,
            ),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid credentials",
                None,
            ),
            Self::MissingUserId => (StatusCode::UNAUTHORIZED, "authorization required", None),
            Self::Forbidden => (StatusCode::FORBIDDEN, "forbidden", None),
            Self::UserNotFound => (StatusCode::NOT_FOUND, "user not found", None),
            Self::NoteNotFound => (StatusCode::NOT_FOUND, "note not found", None),
            Self::UserAlreadyExists => (StatusCode::CONFLICT, "user already exists", None),
            Self::UserCreation(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to create user",
                Some(details.clone()),
            ),
            Self::NoteCreation(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to create note",
                Some(details.clone()),
            ),
            Self::NoteUpdate(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to update note",
                Some(details.clone()),
            ),
            Self::NoteDeletion(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to delete note",
                Some(details.clone()),
            ),
            Self::DatabaseOperation(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "database operation failed",
                Some(details.clone()),
            ),
            Self::TokenGeneration(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to generate tokens",
                Some(details.clone()),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, details) = self.parts();

        if status.is_server_error() {
            error!("{}", self);
        } else {
            debug!(status = status.as_u16(), "{}", self);
        }

        // Ownership failures carry no body.
        if status == StatusCode::FORBIDDEN {
            return status.into_response();
        }

        let body = ErrorResponse {
            error: message.to_string(),
            details,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_of(err: ApiError) -> (StatusCode, Vec<u8>) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn forbidden_has_an_empty_body() {
        let (status, body) = body_of(ApiError::Forbidden).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn bad_request_includes_details() {
        let (status, body) = body_of(ApiError::InvalidData("missing field `name`".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let parsed: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.error, "invalid request data");
        assert_eq!(parsed.details.as_deref(), Some("missing field `name`"));
    }

    #[tokio::test]
    async fn token_failures_share_one_public_message() {
        let (_, expired) = body_of(ApiError::InvalidToken(TokenError::TokenExpired)).await;
        let (_, forged) =
            body_of(ApiError::InvalidToken(TokenError::InvalidSignature("HS256".into()))).await;
        assert_eq!(expired, forged);
    }

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::UserAlreadyExists.status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::NoteNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::MissingUserId.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::database(StoreError::Timeout).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
