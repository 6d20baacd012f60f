//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development. Credentials for external services are
//! only ever read from the environment.

use legal_lens_core::PollConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
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
    pub environment: String,
    /// Base used for share links, e.g. `https://lens.example.com`.
    pub public_base_url: String,
    pub cors_origin: String,

    // --- External services ---
    pub extraction_url: String,
    pub analysis_url: String,
    pub external_api_token: Option<String>,
    pub external_api_key: Option<String>,
    pub extraction_timeout: Duration,
    pub analysis_timeout: Duration,
    pub auth_url: String,
    pub auth_api_key: Option<String>,

    // --- Object storage ---
    pub storage_root: PathBuf,
    pub storage_public_url: String,

    // --- Upload and polling ---
    pub max_upload_bytes: u64,
    pub poll_interval: Duration,
    pub poll_max_attempts: u32,
    /// How long background analyses may keep running after a shutdown signal.
    pub shutdown_grace: Duration,
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

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // --- Load Server and Database Settings ---
        let bind_address = parse_var(&lookup, "BIND_ADDRESS", "0.0.0.0:3000")?;

        let database_url =
            lookup("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let public_base_url = var_or("PUBLIC_BASE_URL", "http://localhost:3000")
            .trim_end_matches('/')
            .to_string();
        let cors_origin = var_or("CORS_ORIGIN", "http://localhost:3000");

        // --- Load External Service Settings ---
        let extraction_url = var_or("EXTRACTION_URL", "http://localhost:7860/extract-text");
        let analysis_url = var_or("ANALYSIS_URL", "http://localhost:7860/analyze");
        let auth_url = var_or("AUTH_URL", "http://localhost:54321")
            .trim_end_matches('/')
            .to_string();
        let extraction_timeout =
            Duration::from_secs(parse_var(&lookup, "EXTRACTION_TIMEOUT_SECS", "15")?);
        let analysis_timeout =
            Duration::from_secs(parse_var(&lookup, "ANALYSIS_TIMEOUT_SECS", "300")?);

        // --- Load Storage Settings ---
        let storage_root = PathBuf::from(var_or("STORAGE_ROOT", "./storage"));
        let storage_public_url = lookup("STORAGE_PUBLIC_URL")
            .unwrap_or_else(|| format!("{}/storage", public_base_url))
            .trim_end_matches('/')
            .to_string();

        // --- Load Upload and Polling Settings ---
        let max_upload_bytes = parse_var(&lookup, "MAX_UPLOAD_BYTES", "10485760")?;
        let poll_interval = Duration::from_millis(parse_var(&lookup, "POLL_INTERVAL_MS", "2000")?);
        let poll_max_attempts: u32 = parse_var(&lookup, "POLL_MAX_ATTEMPTS", "90")?;
        if poll_max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "POLL_MAX_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let shutdown_grace =
            Duration::from_secs(parse_var(&lookup, "SHUTDOWN_GRACE_SECS", "30")?);

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            environment: var_or("APP_ENV", "development"),
            public_base_url,
            cors_origin,
            extraction_url,
            analysis_url,
            external_api_token: lookup("EXTERNAL_API_TOKEN"),
            external_api_key: lookup("EXTERNAL_API_KEY"),
            extraction_timeout,
            analysis_timeout,
            auth_url,
            auth_api_key: lookup("AUTH_API_KEY"),
            storage_root,
            storage_public_url,
            max_upload_bytes,
            poll_interval,
            poll_max_attempts,
            shutdown_grace,
        })
    }
}

impl Config {
    /// Polling cadence for clients waiting on an analysis.
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: self.poll_interval,
            max_attempts: self.poll_max_attempts,
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}
