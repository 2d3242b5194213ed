//! Cache envelope types and the persistent key layout.
//!
//! An envelope wraps a cached payload with the metadata the freshness
//! policy needs (timestamp or calendar date key).

use serde::{Deserialize, Serialize};

use crate::almanac::AlmanacSnapshot;
use crate::constants::cache_keys;
use crate::geo::models::{Coordinates, GeoResult};
use crate::i18n::Lang;
use crate::weather::WeatherSnapshot;

/// Geocoding result plus save time, keyed by `(language, rawText)`.
/// Expired envelopes are ignored on read, not deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoCacheEnvelope {
    #[serde(flatten)]
    pub geo: GeoResult,
    pub saved_at_ms: i64,
}

impl GeoCacheEnvelope {
    pub fn new(geo: GeoResult, saved_at_ms: i64) -> Self {
        Self { geo, saved_at_ms }
    }
}

/// Weather snapshot plus fetch time and the query it answered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherCacheEnvelope {
    pub timestamp_ms: i64,
    pub snapshot: WeatherSnapshot,
    pub meta: WeatherCacheMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherCacheMeta {
    pub location: String,
    pub language: Lang,
    pub coordinates: Coordinates,
}

/// Daily almanac snapshot, one envelope at a time (today's date only).
/// A date-key mismatch discards the envelope outright; stale envelopes are
/// never merged with fresh data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlmanacCacheEnvelope {
    pub calendar_date_key: String,
    pub saved_at_ms: i64,
    pub snapshot: AlmanacSnapshot,
}

/// Store key for a geocoding envelope: `geo:{lang}:{rawLocation}`
pub fn geo_cache_key(lang: Lang, raw_location: &str) -> String {
    format!("{}{}:{raw_location}", cache_keys::GEO_PREFIX, lang.code())
}

/// Store key for a weather envelope: `wx:{lang}:{rawLocation}`
pub fn weather_cache_key(lang: Lang, raw_location: &str) -> String {
    format!("{}{}:{raw_location}", cache_keys::WEATHER_PREFIX, lang.code())
}

/// Store key for the single almanac slot
pub fn almanac_cache_key() -> &'static str {
    cache_keys::ALMANAC_DAILY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(geo_cache_key(Lang::Zh, "板橋"), "geo:zh:板橋");
        assert_eq!(
            weather_cache_key(Lang::En, "Xinyi District Taipei"),
            "wx:en:Xinyi District Taipei"
        );
        assert_eq!(almanac_cache_key(), "almanac:daily");
    }

    #[test]
    fn test_keys_separate_languages() {
        // Language is part of the key so a language switch can never serve
        // the other language's cached result.
        assert_ne!(
            weather_cache_key(Lang::Zh, "板橋"),
            weather_cache_key(Lang::En, "板橋")
        );
    }

    #[test]
    fn test_geo_envelope_serializes_flat() {
        let geo = GeoResult {
            latitude: 25.03,
            longitude: 121.56,
            resolved_name: "信義區".to_string(),
            admin_area: "台北市".to_string(),
            timezone: "Asia/Taipei".to_string(),
            country_code: "TW".to_string(),
            matched_query: "台北市信義區".to_string(),
        };
        let envelope = GeoCacheEnvelope::new(geo, 1_700_000_000_000);

        let value = serde_json::to_value(&envelope).unwrap();
        // Flattened: coordinates live at the top level next to saved_at_ms
        assert_eq!(value["latitude"], 25.03);
        assert_eq!(value["saved_at_ms"], 1_700_000_000_000i64);

        let back: GeoCacheEnvelope = serde_json::from_value(value).unwrap();
        assert_eq!(back.geo.latitude, 25.03);
        assert_eq!(back.geo.resolved_name, "信義區");
    }
}
