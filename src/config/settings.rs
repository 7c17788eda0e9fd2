//! Application settings loaded from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use super::constants::{
    DEFAULT_CORS_ORIGINS, DEFAULT_DAILY_SHUTDOWN_HOUR, DEFAULT_DAILY_SHUTDOWN_UTC_OFFSET_HOURS,
    DEFAULT_DATABASE_URL, DEFAULT_INACTIVITY_POLL_SECONDS, DEFAULT_INACTIVITY_TIMEOUT_MINUTES,
    DEFAULT_JWT_EXPIRATION_HOURS, DEFAULT_MAX_USERS_PER_ADMIN, DEFAULT_SEED_ADMIN_USERNAME,
    DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT, DEFAULT_SHUTDOWN_BUFFER_SECONDS,
    DEFAULT_VENDOR_BASE_URL, DEFAULT_VENDOR_TIMEOUT_SECS, MAX_INACTIVITY_TIMEOUT_MINUTES,
    MAX_JWT_EXPIRATION_HOURS, MAX_VENDOR_TIMEOUT_SECS, MIN_JWT_SECRET_LENGTH, MIN_PASSWORD_LENGTH,
};
use crate::errors::{AppError, AppResult};

/// Application configuration
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub server_host: String,
    pub server_port: u16,
    pub cors_origins: Vec<String>,

    pub vendor_base_url: String,
    vendor_bearer_token: Option<String>,
    pub vendor_timeout: Duration,

    pub max_users_per_admin: u64,

    pub inactivity_timeout_minutes: i64,
    pub inactivity_poll_interval: Duration,
    pub daily_shutdown_hour: u32,
    pub daily_shutdown_utc_offset_hours: i32,
    pub shutdown_buffer: Duration,

    pub seed_admin_username: String,
    seed_admin_password: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_expiration_hours", &self.jwt_expiration_hours)
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("cors_origins", &self.cors_origins)
            .field("vendor_base_url", &self.vendor_base_url)
            .field("vendor_bearer_token", &"[REDACTED]")
            .field("vendor_timeout", &self.vendor_timeout)
            .field("max_users_per_admin", &self.max_users_per_admin)
            .field("inactivity_timeout_minutes", &self.inactivity_timeout_minutes)
            .field("inactivity_poll_interval", &self.inactivity_poll_interval)
            .field("daily_shutdown_hour", &self.daily_shutdown_hour)
            .field(
                "daily_shutdown_utc_offset_hours",
                &self.daily_shutdown_utc_offset_hours,
            )
            .field("shutdown_buffer", &self.shutdown_buffer)
            .field("seed_admin_username", &self.seed_admin_username)
            .field("seed_admin_password", &"[REDACTED]")
            .finish()
    }
}

/// Parse an optional numeric variable, rejecting values that are present but malformed.
fn parse_var<T: FromStr>(key: &str, default: T) -> AppResult<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::validation(format!("{} has an invalid value: {}", key, raw))),
        Err(_) => Ok(default),
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    ///
    /// # Errors
    /// Fails when JWT_SECRET is missing in release builds, when it is too short,
    /// or when a numeric setting cannot be parsed or is out of range.
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let jwt_secret = match non_empty_var("JWT_SECRET") {
            Some(secret) => secret,
            None if cfg!(debug_assertions) => {
                tracing::warn!("JWT_SECRET not set, using insecure default for development");
                "dev-secret-key-minimum-32-chars!!".to_string()
            }
            None => {
                return Err(AppError::validation(
                    "JWT_SECRET environment variable must be set in production",
                ))
            }
        };

        let cors_origins = match non_empty_var("CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            None => DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
        };

        let config = Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            jwt_secret,
            jwt_expiration_hours: parse_var("JWT_EXPIRATION_HOURS", DEFAULT_JWT_EXPIRATION_HOURS)?,
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
            server_port: parse_var("SERVER_PORT", DEFAULT_SERVER_PORT)?,
            cors_origins,
            vendor_base_url: env::var("VENDOR_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_VENDOR_BASE_URL.to_string()),
            vendor_bearer_token: non_empty_var("VENDOR_BEARER_TOKEN"),
            vendor_timeout: Duration::from_secs(parse_var(
                "VENDOR_TIMEOUT_SECS",
                DEFAULT_VENDOR_TIMEOUT_SECS,
            )?),
            max_users_per_admin: parse_var("MAX_USERS_PER_ADMIN", DEFAULT_MAX_USERS_PER_ADMIN)?,
            inactivity_timeout_minutes: parse_var(
                "INACTIVITY_TIMEOUT_MINUTES",
                DEFAULT_INACTIVITY_TIMEOUT_MINUTES,
            )?,
            inactivity_poll_interval: Duration::from_secs(parse_var(
                "INACTIVITY_POLL_SECONDS",
                DEFAULT_INACTIVITY_POLL_SECONDS,
            )?),
            daily_shutdown_hour: parse_var("DAILY_SHUTDOWN_HOUR", DEFAULT_DAILY_SHUTDOWN_HOUR)?,
            daily_shutdown_utc_offset_hours: parse_var(
                "DAILY_SHUTDOWN_UTC_OFFSET_HOURS",
                DEFAULT_DAILY_SHUTDOWN_UTC_OFFSET_HOURS,
            )?,
            shutdown_buffer: Duration::from_secs(parse_var(
                "SHUTDOWN_BUFFER_SECONDS",
                DEFAULT_SHUTDOWN_BUFFER_SECONDS,
            )?),
            seed_admin_username: non_empty_var("SEED_ADMIN_USERNAME")
                .unwrap_or_else(|| DEFAULT_SEED_ADMIN_USERNAME.to_string()),
            seed_admin_password: non_empty_var("SEED_ADMIN_PASSWORD"),
        };

        config.validate()?;
        Ok(config)
    }

    /// Configuration with every default applied and the given signing secret.
    ///
    /// Used by tests and embedders that build their own settings.
    pub fn with_jwt_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            jwt_secret: jwt_secret.into(),
            jwt_expiration_hours: DEFAULT_JWT_EXPIRATION_HOURS,
            server_host: DEFAULT_SERVER_HOST.to_string(),
            server_port: DEFAULT_SERVER_PORT,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
            vendor_base_url: DEFAULT_VENDOR_BASE_URL.to_string(),
            vendor_bearer_token: None,
            vendor_timeout: Duration::from_secs(DEFAULT_VENDOR_TIMEOUT_SECS),
            max_users_per_admin: DEFAULT_MAX_USERS_PER_ADMIN,
            inactivity_timeout_minutes: DEFAULT_INACTIVITY_TIMEOUT_MINUTES,
            inactivity_poll_interval: Duration::from_secs(DEFAULT_INACTIVITY_POLL_SECONDS),
            daily_shutdown_hour: DEFAULT_DAILY_SHUTDOWN_HOUR,
            daily_shutdown_utc_offset_hours: DEFAULT_DAILY_SHUTDOWN_UTC_OFFSET_HOURS,
            shutdown_buffer: Duration::from_secs(DEFAULT_SHUTDOWN_BUFFER_SECONDS),
            seed_admin_username: DEFAULT_SEED_ADMIN_USERNAME.to_string(),
            seed_admin_password: None,
        }
    }

    /// Set the process-wide provider token.
    pub fn with_vendor_token(mut self, token: impl Into<String>) -> Self {
        self.vendor_bearer_token = Some(token.into());
        self
    }

    /// Set the bootstrap administrator password.
    pub fn with_seed_admin_password(mut self, password: impl Into<String>) -> Self {
        self.seed_admin_password = Some(password.into());
        self
    }

    fn validate(&self) -> AppResult<()> {
        if self.jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(AppError::validation(format!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LENGTH
            )));
        }
        if self.daily_shutdown_hour > 23 {
            return Err(AppError::validation("DAILY_SHUTDOWN_HOUR must be between 0 and 23"));
        }
        if !(-12..=14).contains(&self.daily_shutdown_utc_offset_hours) {
            return Err(AppError::validation(
                "DAILY_SHUTDOWN_UTC_OFFSET_HOURS must be between -12 and 14",
            ));
        }
        if !(1..=MAX_INACTIVITY_TIMEOUT_MINUTES).contains(&self.inactivity_timeout_minutes) {
            return Err(AppError::validation(format!(
                "INACTIVITY_TIMEOUT_MINUTES must be between 1 and {MAX_INACTIVITY_TIMEOUT_MINUTES}"
            )));
        }
        if !(1..=MAX_JWT_EXPIRATION_HOURS).contains(&self.jwt_expiration_hours) {
            return Err(AppError::validation(format!(
                "JWT_EXPIRATION_HOURS must be between 1 and {MAX_JWT_EXPIRATION_HOURS}"
            )));
        }
        if self.vendor_timeout.is_zero()
            || self.vendor_timeout > Duration::from_secs(MAX_VENDOR_TIMEOUT_SECS)
        {
            return Err(AppError::validation(format!(
                "VENDOR_TIMEOUT_SECS must be between 1 and {MAX_VENDOR_TIMEOUT_SECS}"
            )));
        }
        if self.inactivity_poll_interval.is_zero() {
            return Err(AppError::validation("INACTIVITY_POLL_SECONDS must be positive"));
        }
        if let Some(password) = &self.seed_admin_password {
            if password.len() < MIN_PASSWORD_LENGTH as usize {
                return Err(AppError::validation(format!(
                    "SEED_ADMIN_PASSWORD must be at least {} characters",
                    MIN_PASSWORD_LENGTH
                )));
            }
        }
        Ok(())
    }

    /// Get JWT secret bytes for token signing/verification.
    pub fn jwt_secret_bytes(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Process-wide provider token, used for users without their own.
    pub fn vendor_bearer_token(&self) -> Option<&str> {
        self.vendor_bearer_token.as_deref()
    }

    /// Password for the bootstrap administrator, if configured.
    pub fn seed_admin_password(&self) -> Option<&str> {
        self.seed_admin_password.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::with_jwt_secret("test-secret-key-for-testing-only-32chars");
        assert_eq!(config.server_port, 8000);
        assert_eq!(config.max_users_per_admin, 15);
        assert_eq!(config.inactivity_timeout_minutes, 180);
        assert_eq!(config.daily_shutdown_hour, 23);
        assert_eq!(config.daily_shutdown_utc_offset_hours, 8);
        assert!(config.vendor_bearer_token().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config::with_jwt_secret("test-secret-key-for-testing-only-32chars")
            .with_vendor_token("vendor-token-value");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("test-secret-key"));
        assert!(!rendered.contains("vendor-token-value"));
    }

    #[test]
    fn test_short_secret_rejected() {
        let config = Config::with_jwt_secret("short");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_shutdown_hour_rejected() {
        let mut config = Config::with_jwt_secret("test-secret-key-for-testing-only-32chars");
        config.daily_shutdown_hour = 24;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_out_of_range_limits_rejected() {
        let base = Config::with_jwt_secret("test-secret-key-for-testing-only-32chars");

        let mut config = base.clone();
        config.vendor_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.inactivity_timeout_minutes = i64::MAX / 2;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.inactivity_timeout_minutes = 0;
        assert!(config.validate().is_err());

        let mut config = base;
        config.jwt_expiration_hours = i64::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_short_seed_password_rejected() {
        let config = Config::with_jwt_secret("test-secret-key-for-testing-only-32chars")
            .with_seed_admin_password("short");
        assert!(config.validate().is_err());
    }
}
