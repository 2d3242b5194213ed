use std::path::Path;

/// Returns the platform-specific path for the config file.
///
/// # Notes
/// - Uses platform-specific config directory (e.g., ~/.config on Linux)
/// - Falls back to current directory if config directory is unavailable
pub fn get_config_path() -> String {
    dirs::config_dir()
        .unwrap_or_else(|| Path::new(".").to_path_buf())
        .join("wallcal")
        .join("config.toml")
        .to_string_lossy()
        .to_string()
}

/// Returns the platform-specific path for the log directory.
pub fn get_log_dir_path() -> String {
    dirs::config_dir()
        .unwrap_or_else(|| Path::new(".").to_path_buf())
        .join("wallcal")
        .join("logs")
        .to_string_lossy()
        .to_string()
}

/// Returns the platform-specific default path for the persistent
/// key-value store file.
pub fn get_store_path() -> String {
    dirs::data_dir()
        .or_else(dirs::config_dir)
        .unwrap_or_else(|| Path::new(".").to_path_buf())
        .join("wallcal")
        .join("store.json")
        .to_string_lossy()
        .to_string()
}
