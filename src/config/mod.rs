use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;

pub mod paths;
pub mod validation;

use crate::constants::{self, api, env_vars};
use paths::{get_config_path, get_log_dir_path, get_store_path};
use validation::validate_config;

/// Configuration structure for the application.
/// Handles loading, saving, and managing application settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Forecast-by-coordinates endpoint
    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,
    /// Geocoding-by-name endpoint
    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,
    /// Almanac-by-date endpoint
    #[serde(default = "default_almanac_url")]
    pub almanac_url: String,
    /// API key sent in the almanac request header
    #[serde(default = "default_almanac_api_key")]
    pub almanac_api_key: String,
    /// Path to the log file. If not specified, logs go to a default location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file_path: Option<String>,
    /// Path to the persistent key-value store file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_path: Option<String>,
    /// Path to an external gazetteer resource; the bundled table is used
    /// when not specified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gazetteer_path: Option<String>,
    /// HTTP timeout in seconds for API requests. Defaults to 30 seconds.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,
}

fn default_forecast_url() -> String {
    api::FORECAST_URL.to_string()
}

fn default_geocoding_url() -> String {
    api::GEOCODING_URL.to_string()
}

fn default_almanac_url() -> String {
    api::ALMANAC_URL.to_string()
}

fn default_almanac_api_key() -> String {
    api::ALMANAC_API_KEY.to_string()
}

fn default_http_timeout() -> u64 {
    constants::DEFAULT_HTTP_TIMEOUT_SECONDS
}

impl Default for Config {
    fn default() -> Self {
        Config {
            forecast_url: default_forecast_url(),
            geocoding_url: default_geocoding_url(),
            almanac_url: default_almanac_url(),
            almanac_api_key: default_almanac_api_key(),
            log_file_path: None,
            store_path: None,
            gazetteer_path: None,
            http_timeout_seconds: default_http_timeout(),
        }
    }
}

impl Config {
    /// Loads configuration from the default config file location, falling
    /// back to defaults when no file exists. Environment variables override
    /// config file values.
    ///
    /// # Environment Variables
    /// - `WALLCAL_FORECAST_URL` / `WALLCAL_GEOCODING_URL` /
    ///   `WALLCAL_ALMANAC_URL` - Override API endpoints
    /// - `WALLCAL_ALMANAC_API_KEY` - Override the almanac API key
    /// - `WALLCAL_LOG_FILE` - Override log file path
    /// - `WALLCAL_STORE_PATH` - Override the persistent store path
    /// - `WALLCAL_HTTP_TIMEOUT` - Override HTTP timeout in seconds
    pub async fn load() -> Result<Self, AppError> {
        Self::load_from_path(&get_config_path()).await
    }

    /// Loads configuration from an explicit path (used by tests)
    pub async fn load_from_path(config_path: &str) -> Result<Self, AppError> {
        let mut config = if Path::new(config_path).exists() {
            let content = fs::read_to_string(config_path).await?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // Override with environment variables if present
        if let Ok(url) = std::env::var(env_vars::FORECAST_URL) {
            config.forecast_url = url;
        }
        if let Ok(url) = std::env::var(env_vars::GEOCODING_URL) {
            config.geocoding_url = url;
        }
        if let Ok(url) = std::env::var(env_vars::ALMANAC_URL) {
            config.almanac_url = url;
        }
        if let Ok(key) = std::env::var(env_vars::ALMANAC_API_KEY) {
            config.almanac_api_key = key;
        }
        if let Ok(log_file_path) = std::env::var(env_vars::LOG_FILE) {
            config.log_file_path = Some(log_file_path);
        }
        if let Ok(store_path) = std::env::var(env_vars::STORE_PATH) {
            config.store_path = Some(store_path);
        }
        if let Some(timeout) = std::env::var(env_vars::HTTP_TIMEOUT)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            config.http_timeout_seconds = timeout;
        }

        config.validate()?;

        Ok(config)
    }

    /// Validates the configuration settings
    pub fn validate(&self) -> Result<(), AppError> {
        validate_config(
            &self.forecast_url,
            &self.geocoding_url,
            &self.almanac_url,
            self.http_timeout_seconds,
            &self.log_file_path,
        )
    }

    /// Saves current configuration to the default config file location.
    pub async fn save(&self) -> Result<(), AppError> {
        self.save_to_path(&get_config_path()).await
    }

    /// Saves configuration to an explicit path
    pub async fn save_to_path(&self, config_path: &str) -> Result<(), AppError> {
        if let Some(parent) = Path::new(config_path).parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = toml::to_string_pretty(self)?;
        let mut file = fs::File::create(config_path).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }

    /// Display the effective configuration, masking the API key
    pub fn display(&self) -> String {
        let masked_key = if self.almanac_api_key.len() > 4 {
            format!("{}…", &self.almanac_api_key[..4])
        } else {
            "****".to_string()
        };
        format!(
            "forecast_url: {}\ngeocoding_url: {}\nalmanac_url: {}\nalmanac_api_key: {}\nstore_path: {}\nlog_file_path: {}\ngazetteer_path: {}\nhttp_timeout_seconds: {}",
            self.forecast_url,
            self.geocoding_url,
            self.almanac_url,
            masked_key,
            self.store_path.as_deref().unwrap_or(&get_store_path()),
            self.log_file_path
                .as_deref()
                .unwrap_or(&format!("{}/wallcal.log", get_log_dir_path())),
            self.gazetteer_path.as_deref().unwrap_or("(bundled)"),
            self.http_timeout_seconds
        )
    }

    /// Effective path of the persistent key-value store
    pub fn effective_store_path(&self) -> String {
        self.store_path.clone().unwrap_or_else(get_store_path)
    }

    pub fn get_log_dir_path() -> String {
        get_log_dir_path()
    }
}
