use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use notekeep_token::TokenManager;
use tracing::debug;

use crate::error::ApiError;

const BEARER_PREFIX: &str = "Bearer ";

/// Identity of the caller, attached to the request by [`require_auth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub i64);

/// Validate the bearer access token and attach its user id before the
/// protected handler runs. Any failure short-circuits with 401.
pub async fn require_auth(
    State(tokens): State<Arc<TokenManager>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = {
        let token = bearer_token(req.headers())?;
        tokens.validate_access(token).map_err(|e| {
            debug!(error = %e, "rejected access token");
            ApiError::InvalidToken(e)
        })?
    };

    req.extensions_mut().insert(UserId(user_id));
    Ok(next.run(req).await)
}

/// Pull the token out of `Authorization: Bearer <token>`. The scheme is
/// case-sensitive and the token must be non-empty.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(ApiError::MissingAuthHeader)?;
    if value.is_empty() {
        return Err(ApiError::MissingAuthHeader);
    }

    let value = value.to_str().map_err(|_| ApiError::InvalidAuthFormat)?;
    match value.strip_prefix(BEARER_PREFIX) {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(ApiError::InvalidAuthFormat),
    }
}
