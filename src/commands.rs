//! One-shot configuration and maintenance commands.

use tracing::info;

use crate::cache::KvStore;
use crate::cli::Args;
use crate::config::Config;
use crate::error::AppError;

/// Handle commands that run and exit without starting the dashboard.
/// Returns `true` when a command was handled and the process should exit.
pub async fn handle_config_commands(args: &Args) -> Result<bool, AppError> {
    if args.list_config {
        let config = Config::load().await?;
        println!("{}", config.display());
        return Ok(true);
    }

    if let Some(key) = &args.set_almanac_key {
        if key.trim().is_empty() {
            return Err(AppError::config_error("almanac API key cannot be empty"));
        }
        let mut config = Config::load().await?;
        config.almanac_api_key = key.trim().to_string();
        config.save().await?;
        println!("Almanac API key updated");
        return Ok(true);
    }

    if args.clear_cache {
        let config = Config::load().await?;
        let store = KvStore::open(config.effective_store_path());
        store.clear_all();
        info!("Cache store cleared: {}", store.path().display());
        println!("Caches cleared");
        return Ok(true);
    }

    Ok(false)
}
