//! Application-wide constants and configuration values
//!
//! This module centralizes all magic numbers and configuration constants
//! to improve maintainability and make the codebase more configurable.

#![allow(dead_code)]

/// Default timeout for HTTP requests in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;

/// Maximum number of connections per host in the HTTP client pool
pub const HTTP_POOL_MAX_IDLE_PER_HOST: usize = 100;

/// IANA name of the dashboard's fixed target timezone
pub const TZ_NAME: &str = "Asia/Taipei";

/// UTC offset of the target timezone in seconds (UTC+8, no DST)
pub const TAIPEI_UTC_OFFSET_SECONDS: i32 = 8 * 3600;

/// Cache TTL (Time To Live) values in milliseconds
pub mod cache_ttl {
    /// TTL for weather forecast envelopes (2 hours)
    pub const WEATHER_MS: i64 = 2 * 60 * 60 * 1000;

    /// TTL for geocoding results (7 days). Expired entries are ignored on
    /// read, not deleted; the next successful resolution overwrites them.
    pub const GEO_MS: i64 = 7 * 24 * 60 * 60 * 1000;
}

/// Persistent store key layout
pub mod cache_keys {
    /// Prefix for geocoding envelopes: `geo:{lang}:{rawLocation}`
    pub const GEO_PREFIX: &str = "geo:";

    /// Prefix for weather envelopes: `wx:{lang}:{rawLocation}`
    pub const WEATHER_PREFIX: &str = "wx:";

    /// Single-slot key for the daily almanac envelope
    pub const ALMANAC_DAILY: &str = "almanac:daily";
}

/// Refresh cadence values
pub mod cadence {
    /// Weather ticks are aligned to even wall-clock hours
    pub const WEATHER_ALIGN_HOURS: u32 = 2;

    /// Fixed repeat period after the first aligned weather tick (seconds).
    /// Not re-aligned afterwards; drift across DST transitions is accepted.
    pub const WEATHER_PERIOD_SECONDS: u64 = 2 * 60 * 60;

    /// Minimum interval between day-rollover checks (milliseconds).
    /// A resume trigger bypasses this throttle.
    pub const ROLLOVER_CHECK_MIN_INTERVAL_MS: i64 = 60 * 1000;

    /// Scheduler clock tick driving the throttled rollover poll (seconds)
    pub const CLOCK_TICK_SECONDS: u64 = 10;
}

/// Upstream API endpoints and fixed parameters
pub mod api {
    /// Geocoding-by-name endpoint (ranked place candidates with coordinates)
    pub const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";

    /// Forecast-by-coordinates endpoint
    pub const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

    /// Almanac-by-date endpoint (authenticated)
    pub const ALMANAC_URL: &str = "https://api.doctorfate.net/query";

    /// Fixed API key header value for the almanac endpoint
    pub const ALMANAC_API_KEY: &str = "PowerLife-APP-2025-v1";

    /// Header carrying the almanac API key
    pub const ALMANAC_API_KEY_HEADER: &str = "X-API-Key";

    /// Number of candidates requested per geocoding query
    pub const GEOCODING_RESULT_COUNT: u32 = 5;

    /// Country constraint used by the first geocoding pass
    pub const GEOCODING_COUNTRY_CODE: &str = "TW";
}

/// Per-language default location strings, used when no location is supplied
pub mod default_location {
    pub const ZH: &str = "台北市信義區";
    pub const EN: &str = "Xinyi District Taipei";
}

/// View-building limits
pub mod view {
    /// Maximum yi/ji terms shown before the list is clamped with an ellipsis
    pub const YIJI_CLAMP: usize = 6;

    /// Hours of the temperature trend handed to the sparkline collaborator
    pub const TREND_HOURS: usize = 6;
}

/// Environment variable names
pub mod env_vars {
    /// Override for the forecast API endpoint
    pub const FORECAST_URL: &str = "WALLCAL_FORECAST_URL";

    /// Override for the geocoding API endpoint
    pub const GEOCODING_URL: &str = "WALLCAL_GEOCODING_URL";

    /// Override for the almanac API endpoint
    pub const ALMANAC_URL: &str = "WALLCAL_ALMANAC_URL";

    /// Override for the almanac API key
    pub const ALMANAC_API_KEY: &str = "WALLCAL_ALMANAC_API_KEY";

    /// Override for the log file path
    pub const LOG_FILE: &str = "WALLCAL_LOG_FILE";

    /// Override for the persistent store path
    pub const STORE_PATH: &str = "WALLCAL_STORE_PATH";

    /// Override for the HTTP timeout in seconds
    pub const HTTP_TIMEOUT: &str = "WALLCAL_HTTP_TIMEOUT";
}

/// Retry configuration for transient upstream failures
pub mod retry {
    /// Maximum number of retry attempts for API calls
    pub const MAX_ATTEMPTS: u32 = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 250;
}
