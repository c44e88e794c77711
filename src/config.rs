use std::env;
use thiserror::Error;

/// AppConfig
///
/// Holds the application's entire configuration state. The struct is immutable once loaded
/// and is pulled into handlers and extractors via FromRef as part of the unified `AppState`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // SQLite connection string, e.g. `sqlite://music_catalog.db` or `sqlite::memory:`.
    pub db_url: String,
    // Address the HTTP listener binds to.
    pub bind_addr: String,
    // Runtime environment marker. Selects the log format and secret requirements.
    pub env: Env,
    // HMAC secret used to sign and verify access/refresh tokens.
    pub jwt_secret: String,
    // Lifetime of an access token, in seconds.
    pub access_token_ttl_secs: i64,
    // Lifetime of a refresh token, in seconds.
    pub refresh_token_ttl_secs: i64,
}

/// Env
///
/// Defines the runtime context: human-readable logs and fallback secrets locally,
/// JSON logs and mandatory secrets in production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// Failures raised while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    MissingVar(&'static str),

    #[error("{name} must be an integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

const LOCAL_DB_URL: &str = "sqlite://music_catalog.db";
const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_ACCESS_TTL_SECS: i64 = 5 * 60;
const DEFAULT_REFRESH_TTL_SECS: i64 = 24 * 60 * 60;

impl Default for AppConfig {
    /// Provides a non-panicking configuration for test scaffolding: an in-memory
    /// database and a fixed signing secret.
    fn default() -> Self {
        Self {
            db_url: "sqlite::memory:".to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            env: Env::Local,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            access_token_ttl_secs: DEFAULT_ACCESS_TTL_SECS,
            refresh_token_ttl_secs: DEFAULT_REFRESH_TTL_SECS,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads every parameter from environment variables. In production the database URL and
    /// the JWT secret are mandatory; locally both fall back to development defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let (db_url, jwt_secret) = match env {
            Env::Production => (
                env::var("DATABASE_URL").map_err(|_| ConfigError::MissingVar("DATABASE_URL"))?,
                env::var("JWT_SECRET").map_err(|_| ConfigError::MissingVar("JWT_SECRET"))?,
            ),
            Env::Local => (
                env::var("DATABASE_URL").unwrap_or_else(|_| LOCAL_DB_URL.to_string()),
                env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
            ),
        };

        Ok(Self {
            db_url,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            env,
            jwt_secret,
            access_token_ttl_secs: read_secs("ACCESS_TOKEN_TTL_SECS", DEFAULT_ACCESS_TTL_SECS)?,
            refresh_token_ttl_secs: read_secs("REFRESH_TOKEN_TTL_SECS", DEFAULT_REFRESH_TTL_SECS)?,
        })
    }
}

fn read_secs(name: &'static str, default: i64) -> Result<i64, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        Err(_) => Ok(default),
    }
}
