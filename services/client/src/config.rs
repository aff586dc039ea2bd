use reqwest::Url;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: Url,
    pub voice_api_url: Url,
    pub storage_path: PathBuf,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let api_base_url = parse_url(
            "CONCIERGE_API_URL",
            std::env::var("CONCIERGE_API_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
        )?;

        let voice_api_url = parse_url(
            "CONCIERGE_VOICE_URL",
            std::env::var("CONCIERGE_VOICE_URL")
                .unwrap_or_else(|_| "https://api.vapi.ai".to_string()),
        )?;

        let storage_path = match std::env::var("CONCIERGE_STORAGE_PATH") {
            Ok(path) => PathBuf::from(path),
            Err(_) => dirs::data_local_dir()
                .map(|dir| dir.join("concierge").join("storage.json"))
                .ok_or_else(|| {
                    ConfigError::MissingVar(
                        "CONCIERGE_STORAGE_PATH (no local data directory on this platform)"
                            .to_string(),
                    )
                })?,
        };

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            api_base_url,
            voice_api_url,
            storage_path,
            log_level,
        })
    }
}

fn parse_url(var: &str, value: String) -> Result<Url, ConfigError> {
    Url::parse(&value).map_err(|e| ConfigError::InvalidValue(var.to_string(), e.to_string()))
}
