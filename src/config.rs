//! Process configuration.
//!
//! Built once in `main` and handed to every component through `AppState`.

use std::str::FromStr;

/// Configuration errors raised while reading the environment
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {var}: {reason}")]
    InvalidEnvValue { var: String, reason: String },
}

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres connection string. `None` runs against the in-memory store.
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub db_max_connections: u32,
    /// Lifetime of a pending cooperation request (default: 7 days).
    pub cooperation_request_ttl_days: i64,
    /// Interval of the cooperation expiry sweep. 0 disables it.
    pub cooperation_sweep_interval_secs: u64,
    pub default_currency: String,
    pub availability_default_days: u32,
    pub availability_max_days: u32,
    pub page_limit_max: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            bind_addr: "0.0.0.0:8080".to_string(),
            db_max_connections: 10,
            cooperation_request_ttl_days: 7,
            cooperation_sweep_interval_secs: 600,
            default_currency: "CNY".to_string(),
            availability_default_days: 30,
            availability_max_days: 90,
            page_limit_max: 200,
        }
    }
}

impl AppConfig {
    /// Read configuration from the environment, loading `.env` first if present
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Ok(Self {
            database_url: optional_var("DATABASE_URL"),
            bind_addr: optional_var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            db_max_connections: parsed_var("DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            cooperation_request_ttl_days: parsed_var(
                "COOPERATION_REQUEST_TTL_DAYS",
                defaults.cooperation_request_ttl_days,
            )?,
            cooperation_sweep_interval_secs: parsed_var(
                "COOPERATION_SWEEP_INTERVAL_SECS",
                defaults.cooperation_sweep_interval_secs,
            )?,
            default_currency: optional_var("DEFAULT_CURRENCY").unwrap_or(defaults.default_currency),
            availability_default_days: parsed_var(
                "AVAILABILITY_DEFAULT_DAYS",
                defaults.availability_default_days,
            )?,
            availability_max_days: parsed_var(
                "AVAILABILITY_MAX_DAYS",
                defaults.availability_max_days,
            )?,
            page_limit_max: parsed_var("PAGE_LIMIT_MAX", defaults.page_limit_max)?,
        }
        .validated()?)
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if self.cooperation_request_ttl_days <= 0 {
            return Err(ConfigError::InvalidEnvValue {
                var: "COOPERATION_REQUEST_TTL_DAYS".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.availability_max_days == 0 {
            return Err(ConfigError::InvalidEnvValue {
                var: "AVAILABILITY_MAX_DAYS".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.page_limit_max <= 0 {
            return Err(ConfigError::InvalidEnvValue {
                var: "PAGE_LIMIT_MAX".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(self)
    }

    /// Clamp a requested availability window to `1..=availability_max_days`
    pub fn clamp_availability_days(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.availability_default_days)
            .clamp(1, self.availability_max_days)
    }
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_var(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnvValue {
            var: name.to_string(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
