use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The two kinds of bearer token. The wire names are part of the envelope
/// and must match between services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    #[serde(rename = "accessToken")]
    Access,
    #[serde(rename = "refreshToken")]
    Refresh,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Access => "accessToken",
            Self::Refresh => "refreshToken",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An access/refresh pair as returned by `TokenManager::issue`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Claims written into every issued token.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct IssuedClaims {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Claims as read back from an untrusted token. Every field is kept as a raw
/// JSON value so that type mismatches surface as the right error kind instead
/// of a generic deserialization failure.
#[derive(Debug, Deserialize)]
pub(crate) struct RawClaims {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(rename = "type", default)]
    pub kind: Option<Value>,
    #[serde(default)]
    pub iat: Option<Value>,
    #[serde(default)]
    pub exp: Option<Value>,
    #[serde(default)]
    pub nbf: Option<Value>,
}

/// Header fields inspected before signature verification.
#[derive(Debug, Deserialize)]
pub(crate) struct RawHeader {
    #[serde(default)]
    pub alg: Option<String>,
}

/// Reads a finite JSON number as an integer, truncating floats toward zero.
pub(crate) fn number_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        _ => None,
    }
}
