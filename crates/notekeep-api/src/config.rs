//! Environment configuration for both services.
//!
//! Parsing goes through a lookup closure so tests never touch the process
//! environment. `from_env` is the production entry point.

use std::path::PathBuf;
use std::time::Duration;

use notekeep_token::TokenConfig;
use thiserror::Error;

const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me",
    "change-me-to-a-random-string",
    "your-secret-key",
    "secret",
];

const DEFAULT_ACCESS_HOURS: u64 = 24;
const DEFAULT_REFRESH_HOURS: u64 = 168;
const DEFAULT_SERVER_TIMEOUT_SECS: u64 = 10;
const DEFAULT_DB_TIMEOUT_SECS: u64 = 5;
const DEFAULT_REDIS_PORT: u16 = 6379;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{key}={value:?} is not a valid {expected}")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("{0} is still a placeholder; set a real secret")]
    Placeholder(&'static str),
}

/// Listener and timeout settings shared by both services.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub server_timeout: Duration,
    pub db_timeout: Duration,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
}

impl std::fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub server: ServerConfig,
    pub token: TokenConfig,
    pub users_db_path: PathBuf,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(lookup);
        Ok(Self {
            server: server_config(&vars)?,
            token: token_config(&vars)?,
            users_db_path: vars
                .get("USERS_DB_PATH")
                .unwrap_or_else(|| "notekeep-users.db".into())
                .into(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct NotesConfig {
    pub server: ServerConfig,
    pub token: TokenConfig,
    pub notes_db_path: PathBuf,
    /// `None` selects the in-process cache.
    pub redis: Option<RedisConfig>,
}

impl NotesConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(lookup);

        let redis = match vars.get("REDIS_HOST") {
            Some(host) => Some(RedisConfig {
                host,
                port: vars.port("REDIS_PORT")?.unwrap_or(DEFAULT_REDIS_PORT),
                password: vars.get("REDIS_PASSWORD"),
            }),
            None => None,
        };

        Ok(Self {
            server: server_config(&vars)?,
            token: token_config(&vars)?,
            notes_db_path: vars
                .get("NOTES_DB_PATH")
                .unwrap_or_else(|| "notekeep-notes.db".into())
                .into(),
            redis,
        })
    }
}

/// Token settings. Both services call this so their tokens interoperate.
fn token_config<F: Fn(&str) -> Option<String>>(vars: &Vars<F>) -> Result<TokenConfig, ConfigError> {
    let secret = vars.required("JWT_SECRET_KEY")?;
    if PLACEHOLDER_SECRETS.contains(&secret.as_str()) {
        return Err(ConfigError::Placeholder("JWT_SECRET_KEY"));
    }

    Ok(TokenConfig {
        secret,
        access_expiration_hours: vars.hours("JWT_ACCESS_TOKEN_EXPIRATION", DEFAULT_ACCESS_HOURS)?,
        refresh_expiration_hours: vars
            .hours("JWT_REFRESH_TOKEN_EXPIRATION", DEFAULT_REFRESH_HOURS)?,
    })
}

fn server_config<F: Fn(&str) -> Option<String>>(vars: &Vars<F>) -> Result<ServerConfig, ConfigError> {
    Ok(ServerConfig {
        host: vars.required("HOST")?,
        port: vars.port("PORT")?.ok_or(ConfigError::Missing("PORT"))?,
        server_timeout: Duration::from_secs(
            vars.positive("SERVER_TIMEOUT", DEFAULT_SERVER_TIMEOUT_SECS)?,
        ),
        db_timeout: Duration::from_secs(vars.positive("DB_TIMEOUT", DEFAULT_DB_TIMEOUT_SECS)?),
    })
}

struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    /// Empty values count as unset.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.is_empty())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.get(key).ok_or(ConfigError::Missing(key))
    }

    fn positive(&self, key: &'static str, default: u64) -> Result<u64, ConfigError> {
        let Some(value) = self.get(key) else {
            return Ok(default);
        };
        match value.parse::<u64>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(ConfigError::Invalid {
                key,
                value,
                expected: "positive integer",
            }),
        }
    }

    fn hours(&self, key: &'static str, default: u64) -> Result<u32, ConfigError> {
        let hours = self.positive(key, default)?;
        u32::try_from(hours).map_err(|_| ConfigError::Invalid {
            key,
            value: hours.to_string(),
            expected: "hour count",
        })
    }

    fn port(&self, key: &'static str) -> Result<Option<u16>, ConfigError> {
        self.get(key)
            .map(|value| {
                value.parse::<u16>().map_err(|_| ConfigError::Invalid {
                    key,
                    value,
                    expected: "port",
                })
            })
            .transpose()
    }
}
