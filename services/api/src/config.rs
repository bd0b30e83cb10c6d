//! Application Configuration Module
//!
//! Centralizes configuration for the interviewer service: settings load from
//! environment variables into a single struct that is passed through the
//! application at startup.

use std::env;

use tracing::Level;

const DEFAULT_PORT: u16 = 8007;

/// Holds all configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub chat_model: String,
    pub log_level: Level,
    pub host: String,
    pub port: u16,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
    #[error("Invalid PORT value: {0}")]
    InvalidPort(String),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `GEMINI_API_KEY`: Your secret key for the Gemini API. Required.
    // *   `CHAT_MODEL`: (Optional) The generation model. Defaults to "gemini-2.0-flash".
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    // *   `HOST` / `PORT`: (Optional) Bind address. Defaults to "0.0.0.0":8007.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. Useful for local development, ignored if not present.
        dotenvy::dotenv().ok();

        let gemini_api_key = env::var("GEMINI_API_KEY")
            .map_err(|_| ConfigError::MissingVar("GEMINI_API_KEY".to_string()))?;

        let chat_model =
            env::var("CHAT_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".to_string());

        let log_level_str = env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self {
            gemini_api_key,
            chat_model,
            log_level,
            host,
            port,
        })
    }
}
