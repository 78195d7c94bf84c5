//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use axum::http::HeaderValue;
use std::net::SocketAddr;
use std::path::PathBuf;
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

    // --- Pinecone Assistant ---
    pub pinecone_api_key: String,
    pub pinecone_control_url: String,
    pub pinecone_assistant_host: String,
    pub pinecone_api_version: String,
    pub assistant_name: String,
    pub assistant_region: String,
    pub assistant_ready_timeout: Duration,
    pub ingest_timeout: Option<Duration>,
    pub poll_interval: Duration,
    pub remote_request_timeout: Option<Duration>,

    // --- Uploads ---
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,

    // --- Auth & HTTP ---
    pub token_ttl: chrono::Duration,
    pub cors_allowed_origin: Option<HeaderValue>,
    pub require_auth_for_study: bool,
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
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // --- Load Server and Database Settings ---
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url =
            var("DATABASE_URL").unwrap_or_else(|| "sqlite://users.db?mode=rwc".to_string());

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Pinecone Settings ---
        let pinecone_api_key = var("PINECONE_API_KEY")
            .or_else(|| var("PINECONE_API"))
            .ok_or_else(|| ConfigError::MissingVar("PINECONE_API_KEY".to_string()))?;
        let pinecone_control_url = var("PINECONE_CONTROL_URL")
            .unwrap_or_else(|| "https://api.pinecone.io".to_string());
        let pinecone_assistant_host = var("PINECONE_ASSISTANT_HOST")
            .unwrap_or_else(|| "https://prod-1-data.ke.pinecone.io".to_string());
        let pinecone_api_version =
            var("PINECONE_API_VERSION").unwrap_or_else(|| "2025-01".to_string());
        let assistant_name = var("ASSISTANT_NAME").unwrap_or_else(|| {
            study_assistant_core::assistant::DEFAULT_ASSISTANT_NAME.to_string()
        });
        let assistant_region = var("ASSISTANT_REGION").unwrap_or_else(|| "us".to_string());

        let assistant_ready_timeout =
            Duration::from_secs(parse_or(&var, "ASSISTANT_READY_TIMEOUT_SECS", 30)?);
        let ingest_timeout = parse_opt::<u64>(&var, "INGEST_TIMEOUT_SECS")?.map(Duration::from_secs);
        let poll_interval = Duration::from_millis(parse_or(&var, "POLL_INTERVAL_MS", 1000)?);
        let remote_request_timeout =
            parse_opt::<u64>(&var, "REMOTE_REQUEST_TIMEOUT_SECS")?.map(Duration::from_secs);

        // --- Load Upload Settings ---
        let upload_dir = var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("uploads"));
        let max_upload_bytes = parse_or(&var, "MAX_UPLOAD_BYTES", 50 * 1024 * 1024)?;

        // --- Load Auth & HTTP Settings ---
        let token_ttl = chrono::Duration::minutes(parse_or(&var, "TOKEN_TTL_MINUTES", 30)?);
        let cors_allowed_origin = var("CORS_ALLOWED_ORIGIN")
            .map(|origin| {
                HeaderValue::from_str(origin.trim()).map_err(|e| {
                    ConfigError::InvalidValue("CORS_ALLOWED_ORIGIN".to_string(), e.to_string())
                })
            })
            .transpose()?;
        let require_auth_for_study = parse_or(&var, "REQUIRE_AUTH_FOR_STUDY", false)?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            pinecone_api_key,
            pinecone_control_url,
            pinecone_assistant_host,
            pinecone_api_version,
            assistant_name,
            assistant_region,
            assistant_ready_timeout,
            ingest_timeout,
            poll_interval,
            remote_request_timeout,
            upload_dir,
            max_upload_bytes,
            token_ttl,
            cors_allowed_origin,
            require_auth_for_study,
        })
    }
}

fn parse_opt<T>(var: impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    var(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
        })
        .transpose()
}

fn parse_or<T>(var: impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_opt(var, key)?.unwrap_or(default))
}
