//! Freshness policy and target-timezone date helpers.
//!
//! Pure predicates over cache envelopes and the current time. They are
//! evaluated fresh on every scheduler tick and every manual trigger, never
//! memoized, because wall-clock time is an input.

use chrono::{DateTime, Datelike, FixedOffset, Utc};

use super::types::{AlmanacCacheEnvelope, WeatherCacheEnvelope};
use crate::constants::{TAIPEI_UTC_OFFSET_SECONDS, cache_ttl};

/// Fixed offset of the target timezone. Asia/Taipei has been UTC+8 with no
/// DST since 1980, so a fixed offset is exact for this dashboard's horizon.
pub fn taipei_offset() -> FixedOffset {
    FixedOffset::east_opt(TAIPEI_UTC_OFFSET_SECONDS).unwrap()
}

/// Current instant expressed in the target timezone
pub fn taipei_time(now_utc: DateTime<Utc>) -> DateTime<FixedOffset> {
    now_utc.with_timezone(&taipei_offset())
}

/// Calendar date key (`YYYY-MM-DD`) of the given instant in the target
/// timezone. This is the almanac cache key and the rollover comparand.
pub fn taipei_date_key(now_utc: DateTime<Utc>) -> String {
    taipei_time(now_utc).format("%Y-%m-%d").to_string()
}

/// `(year, month, day)` of the given instant in the target timezone,
/// as the almanac API expects them
pub fn taipei_ymd(now_utc: DateTime<Utc>) -> (i32, u32, u32) {
    let local = taipei_time(now_utc);
    (local.year(), local.month(), local.day())
}

/// Decide whether the weather envelope must be refetched.
///
/// True when the envelope is absent, its age has reached the 2-hour TTL, or
/// its age is negative. A negative age means the wall clock moved backwards
/// past the save time; treating it as stale forces recovery from clock skew
/// instead of trusting a timestamp from the future.
pub fn needs_weather_refresh(envelope: Option<&WeatherCacheEnvelope>, now_ms: i64) -> bool {
    let Some(envelope) = envelope else {
        return true;
    };

    let age_ms = now_ms - envelope.timestamp_ms;
    age_ms < 0 || age_ms >= cache_ttl::WEATHER_MS
}

/// Decide whether the almanac envelope must be refetched.
///
/// Fresh only while the stored calendar date key equals today's key in the
/// target timezone; any mismatch (including a key from the future) forces a
/// refetch and full overwrite.
pub fn needs_almanac_refresh(envelope: Option<&AlmanacCacheEnvelope>, today_key: &str) -> bool {
    let Some(envelope) = envelope else {
        return true;
    };

    envelope.calendar_date_key != today_key
}

/// Whether a geocoding envelope saved at `saved_at_ms` is still inside the
/// 7-day TTL
pub fn geo_cache_entry_valid(saved_at_ms: i64, now_ms: i64) -> bool {
    now_ms - saved_at_ms <= cache_ttl::GEO_MS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::almanac::AlmanacSnapshot;
    use crate::cache::types::WeatherCacheMeta;
    use crate::geo::models::Coordinates;
    use crate::i18n::Lang;
    use crate::weather::WeatherSnapshot;
    use chrono::TimeZone;

    fn weather_envelope(timestamp_ms: i64) -> WeatherCacheEnvelope {
        WeatherCacheEnvelope {
            timestamp_ms,
            snapshot: WeatherSnapshot::default(),
            meta: WeatherCacheMeta {
                location: "台北市信義區".to_string(),
                language: Lang::Zh,
                coordinates: Coordinates {
                    latitude: 25.03,
                    longitude: 121.56,
                },
            },
        }
    }

    fn almanac_envelope(date_key: &str) -> AlmanacCacheEnvelope {
        AlmanacCacheEnvelope {
            calendar_date_key: date_key.to_string(),
            saved_at_ms: 0,
            snapshot: AlmanacSnapshot::default(),
        }
    }

    #[test]
    fn test_weather_absent_envelope_needs_refresh() {
        assert!(needs_weather_refresh(None, 1_000));
    }

    #[test]
    fn test_weather_fresh_within_ttl() {
        let now = 10_000_000;
        // Ages in [0, 2h) are fresh
        for age in [0, 1, 60_000, cache_ttl::WEATHER_MS - 1] {
            let envelope = weather_envelope(now - age);
            assert!(
                !needs_weather_refresh(Some(&envelope), now),
                "age {age} should be fresh"
            );
        }
    }

    #[test]
    fn test_weather_stale_at_and_past_ttl() {
        let now = 10_000_000_000;
        for age in [cache_ttl::WEATHER_MS, cache_ttl::WEATHER_MS + 1, i64::MAX / 2] {
            let envelope = weather_envelope(now - age);
            assert!(
                needs_weather_refresh(Some(&envelope), now),
                "age {age} should be stale"
            );
        }
    }

    #[test]
    fn test_weather_clock_regression_is_stale() {
        let now = 10_000_000;
        // Envelope from the future: clock moved backwards
        let envelope = weather_envelope(now + 1);
        assert!(needs_weather_refresh(Some(&envelope), now));
    }

    #[test]
    fn test_almanac_absent_envelope_needs_refresh() {
        assert!(needs_almanac_refresh(None, "2025-01-06"));
    }

    #[test]
    fn test_almanac_fresh_iff_date_key_matches() {
        let envelope = almanac_envelope("2025-01-05");
        assert!(!needs_almanac_refresh(Some(&envelope), "2025-01-05"));
        assert!(needs_almanac_refresh(Some(&envelope), "2025-01-06"));
        // A key from the future is also a mismatch
        assert!(needs_almanac_refresh(Some(&envelope), "2025-01-04"));
    }

    #[test]
    fn test_taipei_date_key_crosses_midnight_before_utc() {
        // 2025-01-05T16:05Z is 2025-01-06T00:05 in Taipei
        let utc = Utc.with_ymd_and_hms(2025, 1, 5, 16, 5, 0).unwrap();
        assert_eq!(taipei_date_key(utc), "2025-01-06");
        assert_eq!(taipei_ymd(utc), (2025, 1, 6));
    }

    #[test]
    fn test_taipei_date_key_same_day() {
        let utc = Utc.with_ymd_and_hms(2025, 1, 5, 8, 0, 0).unwrap();
        assert_eq!(taipei_date_key(utc), "2025-01-05");
    }

    #[test]
    fn test_geo_cache_entry_validity_window() {
        let now = 1_700_000_000_000;
        assert!(geo_cache_entry_valid(now, now));
        assert!(geo_cache_entry_valid(now - cache_ttl::GEO_MS, now));
        assert!(!geo_cache_entry_valid(now - cache_ttl::GEO_MS - 1, now));
    }
}
