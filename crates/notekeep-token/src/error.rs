use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token configuration error: {0}")]
    Configuration(String),

    #[error("failed to generate token: {0}")]
    TokenGeneration(String),

    #[error("unexpected signing method: {0}")]
    InvalidSignature(String),

    #[error("token expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("invalid token type: expected {expected}, got {found}")]
    InvalidTokenType { expected: String, found: String },

    #[error("user id missing from token claims")]
    MissingUserId,
}
