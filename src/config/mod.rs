//! Runtime configuration
//!
//! Settings come from the process environment, optionally seeded from a
//! `.env` file. `Config::from_lookup` takes any key lookup so tests do not
//! have to touch the real environment.

use std::env;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use thiserror::Error;

/// Development-only signing secret, refused in production
const DEV_JWT_SECRET: &str = "development-secret-change-in-production";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid environment value: {0}")]
    InvalidValue(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),
}

/// Deployment tier; only `Production` tightens validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        *self == Environment::Production
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let env = match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Environment::Development,
            "staging" => Environment::Staging,
            "prod" | "production" => Environment::Production,
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "ENVIRONMENT must be dev, staging or prod, got '{other}'"
                )))
            }
        };
        Ok(env)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,

    /// Interface to bind
    pub host: IpAddr,

    pub port: u16,

    /// Comma-separated allow list; `None` means any origin
    pub cors_allowed_origins: Option<String>,

    /// Filter used when `RUST_LOG` is unset or not a valid directive
    pub log_level: String,

    /// HS256 key for session tokens
    pub jwt_secret: String,

    pub jwt_access_token_ttl_seconds: i64,

    /// Seconds a challenge stays valid; 0 disables expiry
    pub auth_nonce_ttl_seconds: i64,
}

impl Config {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is fine
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let environment = match lookup("ENVIRONMENT") {
            Some(raw) => raw.parse::<Environment>()?,
            None => Environment::default(),
        };

        let host = lookup("HOST")
            .as_deref()
            .unwrap_or("127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::InvalidValue("HOST must be an IP address".to_string()))?;

        let port = lookup("PORT")
            .as_deref()
            .unwrap_or("8001")
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("PORT must be a valid number".to_string()))?;

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS").filter(|s| !s.trim().is_empty());

        let log_level = lookup("LOG_LEVEL")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "info".to_string());

        let jwt_secret = match lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None if environment.is_production() => {
                return Err(ConfigError::MissingEnvVar("JWT_SECRET".to_string()))
            }
            None => DEV_JWT_SECRET.to_string(),
        };

        let jwt_access_token_ttl_seconds = seconds(&lookup, "JWT_ACCESS_TOKEN_TTL_SECONDS", 900)?;
        if jwt_access_token_ttl_seconds <= 0 {
            return Err(ConfigError::InvalidValue(
                "JWT_ACCESS_TOKEN_TTL_SECONDS must be positive".to_string(),
            ));
        }

        let auth_nonce_ttl_seconds = seconds(&lookup, "AUTH_NONCE_TTL_SECONDS", 300)?;
        if auth_nonce_ttl_seconds < 0 {
            return Err(ConfigError::InvalidValue(
                "AUTH_NONCE_TTL_SECONDS must not be negative".to_string(),
            ));
        }

        Ok(Config {
            environment,
            host,
            port,
            cors_allowed_origins,
            log_level,
            jwt_secret,
            jwt_access_token_ttl_seconds,
            auth_nonce_ttl_seconds,
        })
    }

    /// Nonce lifetime, or `None` when nonces never expire
    pub fn nonce_ttl(&self) -> Option<chrono::Duration> {
        (self.auth_nonce_ttl_seconds > 0)
            .then(|| chrono::Duration::seconds(self.auth_nonce_ttl_seconds))
    }
}

fn seconds(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: i64,
) -> Result<i64, ConfigError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| ConfigError::InvalidValue(format!("{key} must be a whole number"))),
        None => Ok(default),
    }
}
