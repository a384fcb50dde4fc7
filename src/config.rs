//! Account Service Configuration
//!
//! All configuration values are loaded from environment variables.
//! No hardcoded secrets or sensitive data.

use crate::error::AccountError;
use std::env;
use std::path::PathBuf;

/// Minimum accepted length for a signing secret
const MIN_SECRET_LENGTH: usize = 32;

/// Longest accepted token lifetime: 10 years
const MAX_TOKEN_EXPIRY: i64 = 10 * 365 * 24 * 60 * 60;

/// Account service configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AccountsConfig {
    /// Secret for signing access tokens (from ACCESS_TOKEN_SECRET env var)
    pub access_token_secret: String,

    /// Access token lifetime in seconds (from ACCESS_TOKEN_EXPIRY env var)
    pub access_token_expiry: i64,

    /// Secret for signing refresh tokens (from REFRESH_TOKEN_SECRET env var)
    pub refresh_token_secret: String,

    /// Refresh token lifetime in seconds (from REFRESH_TOKEN_EXPIRY env var)
    pub refresh_token_expiry: i64,

    /// PostgreSQL connection string (from DATABASE_URL env var)
    pub database_url: Option<String>,

    /// Directory uploaded media is moved into (from MEDIA_ROOT env var)
    pub media_root: PathBuf,

    /// Public URL prefix for uploaded media (from MEDIA_BASE_URL env var)
    pub media_base_url: String,

    /// Directory multipart uploads are staged in (from UPLOAD_TEMP_DIR env var)
    pub upload_temp_dir: PathBuf,

    /// Allowed CORS origin (from CORS_ORIGIN env var)
    pub cors_origin: Option<String>,

    /// Server listen address (from BIND_ADDR env var)
    pub bind_addr: String,
}

impl AccountsConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AccountError> {
        Ok(Self {
            access_token_secret: required("ACCESS_TOKEN_SECRET")?,

            access_token_expiry: expiry("ACCESS_TOKEN_EXPIRY", 15 * 60)?,

            refresh_token_secret: required("REFRESH_TOKEN_SECRET")?,

            refresh_token_expiry: expiry("REFRESH_TOKEN_EXPIRY", 10 * 24 * 60 * 60)?,

            database_url: env::var("DATABASE_URL").ok(),

            media_root: env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./public/media")),

            media_base_url: env::var("MEDIA_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "/media".to_string()),

            upload_temp_dir: env::var("UPLOAD_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./public/temp")),

            cors_origin: env::var("CORS_ORIGIN").ok().filter(|v| !v.is_empty()),

            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AccountError> {
        if self.access_token_secret.len() < MIN_SECRET_LENGTH {
            return Err(AccountError::Config(
                "ACCESS_TOKEN_SECRET must be at least 32 characters".to_string(),
            ));
        }

        if self.refresh_token_secret.len() < MIN_SECRET_LENGTH {
            return Err(AccountError::Config(
                "REFRESH_TOKEN_SECRET must be at least 32 characters".to_string(),
            ));
        }

        if self.access_token_secret == self.refresh_token_secret {
            return Err(AccountError::Config(
                "ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ".to_string(),
            ));
        }

        if self.access_token_expiry <= 0 {
            return Err(AccountError::Config(
                "ACCESS_TOKEN_EXPIRY must be positive".to_string(),
            ));
        }

        if self.refresh_token_expiry <= self.access_token_expiry {
            return Err(AccountError::Config(
                "REFRESH_TOKEN_EXPIRY must be greater than ACCESS_TOKEN_EXPIRY".to_string(),
            ));
        }

        if self.refresh_token_expiry > MAX_TOKEN_EXPIRY {
            return Err(AccountError::Config(
                "REFRESH_TOKEN_EXPIRY must not exceed 10 years".to_string(),
            ));
        }

        Ok(())
    }
}

fn required(key: &str) -> Result<String, AccountError> {
    env::var(key).map_err(|_| AccountError::Config(format!("{key} environment variable must be set")))
}

fn expiry(key: &str, default: i64) -> Result<i64, AccountError> {
    match env::var(key) {
        Ok(raw) => parse_duration_secs(&raw)
            .ok_or_else(|| AccountError::Config(format!("{key} is not a valid duration: {raw}"))),
        Err(_) => Ok(default),
    }
}

/// Parse `900`, `30s`, `15m`, `1h` or `10d` into seconds
pub fn parse_duration_secs(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let (digits, multiplier) = match raw.char_indices().last() {
        Some((idx, 's')) => (&raw[..idx], 1),
        Some((idx, 'm')) => (&raw[..idx], 60),
        Some((idx, 'h')) => (&raw[..idx], 60 * 60),
        Some((idx, 'd')) => (&raw[..idx], 24 * 60 * 60),
        _ => (raw, 1),
    };

    digits.parse::<i64>().ok()?.checked_mul(multiplier)
}
