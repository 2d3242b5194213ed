use crate::error::AppError;
use std::path::Path;

fn validate_endpoint(name: &str, url: &str) -> Result<(), AppError> {
    if url.is_empty() {
        return Err(AppError::config_error(format!("{name} URL cannot be empty")));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(AppError::config_error(format!(
            "{name} URL must start with http:// or https://"
        )));
    }
    Ok(())
}

/// Validates the configuration settings
///
/// # Validation Rules
/// - Every endpoint URL must be non-empty and carry an http(s) scheme
/// - The HTTP timeout must be non-zero
/// - If a log file path is provided, its parent directory must exist or
///   be creatable
pub fn validate_config(
    forecast_url: &str,
    geocoding_url: &str,
    almanac_url: &str,
    http_timeout_seconds: u64,
    log_file_path: &Option<String>,
) -> Result<(), AppError> {
    validate_endpoint("forecast", forecast_url)?;
    validate_endpoint("geocoding", geocoding_url)?;
    validate_endpoint("almanac", almanac_url)?;

    if http_timeout_seconds == 0 {
        return Err(AppError::config_error("HTTP timeout must be non-zero"));
    }

    // Validate log file path if provided
    if let Some(log_path) = log_file_path {
        if log_path.is_empty() {
            return Err(AppError::config_error("Log file path cannot be empty"));
        }

        // Check if parent directory exists or can be created
        if let Some(parent) = Path::new(log_path).parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::config_error(format!(
                    "Cannot create log directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    Ok(())
}
