//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub cors_allowed_origin: String,
    /// Not validated at startup; advice calls fail as unavailable without it.
    pub advice_api_key: Option<String>,
    pub advice_api_base: String,
    pub advice_model: String,
    pub advice_temperature: f32,
    pub advice_timeout: Duration,
    pub access_token_ttl: chrono::Duration,
    pub refresh_token_ttl: chrono::Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address = parse_var::<SocketAddr>("BIND_ADDRESS", "0.0.0.0:8000")?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_allowed_origin = std::env::var("CORS_ALLOWED_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:5173".to_string());

        // --- Load the Advice Endpoint Settings ---
        let advice_api_key = std::env::var("GROQ_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        let advice_api_base = std::env::var("ADVICE_API_BASE")
            .unwrap_or_else(|_| "https://api.groq.com/openai/v1".to_string());
        let advice_model = std::env::var("ADVICE_MODEL")
            .unwrap_or_else(|_| "llama-3.3-70b-versatile".to_string());
        let advice_temperature = parse_var::<f32>("ADVICE_TEMPERATURE", "0.7")?;
        let advice_timeout =
            Duration::from_secs(parse_var::<u64>("ADVICE_TIMEOUT_SECS", "60")?);

        // --- Load Token Lifetimes ---
        let access_token_ttl =
            chrono::Duration::minutes(parse_var::<i64>("ACCESS_TOKEN_TTL_MINUTES", "60")?);
        let refresh_token_ttl =
            chrono::Duration::days(parse_var::<i64>("REFRESH_TOKEN_TTL_DAYS", "7")?);

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            cors_allowed_origin,
            advice_api_key,
            advice_api_base,
            advice_model,
            advice_temperature,
            advice_timeout,
            access_token_ttl,
            refresh_token_ttl,
        })
    }
}

fn parse_var<T>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}
