use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::claims::{IssuedClaims, RawClaims, RawHeader, TokenKind, TokenPair, number_as_i64};
use crate::clock::{Clock, SystemClock};
use crate::error::TokenError;

const SECONDS_PER_HOUR: i64 = 3600;

/// Signing secret and token lifetimes. Both services must be built from the
/// same values or tokens stop being portable between them.
#[derive(Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub access_expiration_hours: u32,
    pub refresh_expiration_hours: u32,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("access_expiration_hours", &self.access_expiration_hours)
            .field("refresh_expiration_hours", &self.refresh_expiration_hours)
            .finish()
    }
}

/// Issues and validates HS256 bearer tokens.
pub struct TokenManager {
    config: TokenConfig,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl TokenManager {
    pub fn new(config: TokenConfig) -> Result<Self, TokenError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: TokenConfig, clock: Arc<dyn Clock>) -> Result<Self, TokenError> {
        if config.secret.is_empty() {
            return Err(TokenError::Configuration(
                "signing secret must not be empty".into(),
            ));
        }

        // exp, iat and nbf are checked against the injected clock, not by jsonwebtoken.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        Ok(Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            config,
            clock,
        })
    }

    /// Issue a fresh access/refresh pair for `user_id`.
    pub fn issue(&self, user_id: i64) -> Result<TokenPair, TokenError> {
        let now = self.clock.now();

        let access_token = self.sign(
            user_id,
            TokenKind::Access,
            self.config.access_expiration_hours,
            now,
        )?;
        let refresh_token = self.sign(
            user_id,
            TokenKind::Refresh,
            self.config.refresh_expiration_hours,
            now,
        )?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    pub fn validate_access(&self, token: &str) -> Result<i64, TokenError> {
        self.validate(token, Some(TokenKind::Access))
    }

    pub fn validate_refresh(&self, token: &str) -> Result<i64, TokenError> {
        self.validate(token, Some(TokenKind::Refresh))
    }

    /// Verify `token` and return the user id it carries.
    ///
    /// When `expected` is `None` the token type is not checked.
    pub fn validate(&self, token: &str, expected: Option<TokenKind>) -> Result<i64, TokenError> {
        check_algorithm(token)?;

        let data = decode::<RawClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| TokenError::InvalidToken(e.to_string()))?;
        let claims = data.claims;

        self.check_lifetime(&claims)?;

        if let Some(expected) = expected {
            match claims.kind.as_ref() {
                Some(Value::String(kind)) if kind == expected.as_str() => {}
                other => {
                    return Err(TokenError::InvalidTokenType {
                        expected: expected.to_string(),
                        found: other.map_or_else(|| "nothing".to_string(), Value::to_string),
                    });
                }
            }
        }

        claims
            .id
            .as_ref()
            .and_then(number_as_i64)
            .ok_or(TokenError::MissingUserId)
    }

    fn sign(
        &self,
        user_id: i64,
        kind: TokenKind,
        expiration_hours: u32,
        now: i64,
    ) -> Result<String, TokenError> {
        let claims = IssuedClaims {
            id: user_id,
            kind,
            iat: now,
            exp: now + i64::from(expiration_hours) * SECONDS_PER_HOUR,
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::TokenGeneration(e.to_string()))
    }

    fn check_lifetime(&self, claims: &RawClaims) -> Result<(), TokenError> {
        let now = self.clock.now();

        let exp = claims
            .exp
            .as_ref()
            .and_then(number_as_i64)
            .ok_or_else(|| TokenError::InvalidToken("missing or malformed exp claim".into()))?;
        if now > exp {
            debug!(exp, now, "token expired");
            return Err(TokenError::TokenExpired);
        }

        if let Some(iat) = claims.iat.as_ref().and_then(number_as_i64) {
            if iat > now {
                return Err(TokenError::InvalidToken("token used before issued".into()));
            }
        }

        if let Some(nbf) = claims.nbf.as_ref().and_then(number_as_i64) {
            if nbf > now {
                return Err(TokenError::InvalidToken("token is not valid yet".into()));
            }
        }

        Ok(())
    }
}

/// Reject anything that is not an HMAC envelope before touching the signature.
fn check_algorithm(token: &str) -> Result<(), TokenError> {
    let mut segments = token.split('.');
    let (Some(header), Some(_), Some(_), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(TokenError::InvalidToken(
            "expected three dot-separated segments".into(),
        ));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|e| TokenError::InvalidToken(format!("header is not base64url: {e}")))?;
    let header: RawHeader = serde_json::from_slice(&bytes)
        .map_err(|e| TokenError::InvalidToken(format!("header is not JSON: {e}")))?;

    match header.alg.as_deref() {
        Some("HS256" | "HS384" | "HS512") => Ok(()),
        Some(other) => Err(TokenError::InvalidSignature(other.to_string())),
        None => Err(TokenError::InvalidSignature("missing alg".into())),
    }
}
