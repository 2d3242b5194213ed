//! Wall-Calendar Dashboard Core Library
//!
//! This library resolves free-form place names (zh or en) to coordinates,
//! fetches weather and lunar-almanac data, caches both in a fail-soft
//! persistent store and drives refreshes from an aligned scheduler.
//!
//! # Examples
//!
//! ```rust,no_run
//! use wallcal::almanac::CalendarApi;
//! use wallcal::app::{Dashboard, RefreshContext};
//! use wallcal::cache::KvStore;
//! use wallcal::almanac::terms::YiJiTermIndex;
//! use wallcal::config::Config;
//! use wallcal::error::AppError;
//! use wallcal::geo::OpenMeteoGeocoding;
//! use wallcal::i18n::Lang;
//! use wallcal::net::create_http_client_with_timeout;
//! use wallcal::weather::OpenMeteoForecast;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), AppError> {
//!     let config = Config::load().await?;
//!     let client = create_http_client_with_timeout(config.http_timeout_seconds)?;
//!
//!     let dashboard = Dashboard::new(
//!         KvStore::open(config.effective_store_path()),
//!         OpenMeteoGeocoding::new(client.clone(), &config.geocoding_url),
//!         OpenMeteoForecast::new(client.clone(), &config.forecast_url),
//!         CalendarApi::new(client, &config.almanac_url, &config.almanac_api_key),
//!         YiJiTermIndex::load_bundled()?,
//!         None,
//!     );
//!
//!     let ctx = RefreshContext::new(Lang::Zh, Some("新北市板橋區"));
//!     if let Some(summary) = dashboard.refresh_all(&ctx, chrono::Utc::now()).await {
//!         println!("weather: {:?}", summary.weather.state);
//!         println!("almanac: {}", summary.almanac.describe());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod almanac;
pub mod app;
pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod geo;
pub mod i18n;
pub mod net;
pub mod scheduler;
pub mod weather;

// Re-export commonly used types for convenience
pub use almanac::{AlmanacSnapshot, AlmanacView, CalendarApi, terms::YiJiTermIndex};
pub use app::{AlmanacOutcome, Dashboard, RefreshContext, WeatherFeedState, WeatherOutcome};
pub use cache::{KvStore, needs_almanac_refresh, needs_weather_refresh};
pub use config::Config;
pub use error::AppError;
pub use geo::{GeoResult, Gazetteer, OpenMeteoGeocoding};
pub use i18n::Lang;
pub use weather::{OpenMeteoForecast, WeatherSnapshot, WeatherView};

/// Current version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
