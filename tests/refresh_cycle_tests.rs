//! End-to-end refresh-cycle tests against counting mock backends:
//! cache population, the busy-flag overlap guard, the day-rollover path
//! and failure degradation.

use chrono::{TimeZone, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tempfile::tempdir;

use wallcal::almanac::{AlmanacApi, AlmanacSnapshot, terms::YiJiTermIndex};
use wallcal::app::{AlmanacOutcome, Dashboard, RefreshContext, WeatherFeedState};
use wallcal::cache::{AlmanacCacheEnvelope, KvStore, WeatherCacheEnvelope, weather_cache_key};
use wallcal::error::AppError;
use wallcal::geo::resolver::{GeocodePlace, GeocodeSearchResponse, GeocodingApi};
use wallcal::i18n::Lang;
use wallcal::weather::{CurrentConditions, ForecastApi, WeatherSnapshot};

/// Geocoder that always answers with one fixed place
struct MockGeocoder {
    calls: AtomicUsize,
}

impl MockGeocoder {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl GeocodingApi for MockGeocoder {
    async fn search(
        &self,
        name: &str,
        _lang: Lang,
        _constrain_country: bool,
    ) -> Result<GeocodeSearchResponse, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(GeocodeSearchResponse {
            results: vec![GeocodePlace {
                latitude: Some(25.0),
                longitude: Some(121.5),
                name: Some(name.to_string()),
                admin1: Some("台北市".to_string()),
                timezone: Some("Asia/Taipei".to_string()),
                country_code: Some("TW".to_string()),
            }],
        })
    }
}

/// Forecast backend that yields once before answering, so overlapping
/// cycles actually interleave under the cooperative scheduler
struct MockForecast {
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl MockForecast {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ForecastApi for MockForecast {
    async fn fetch_forecast(
        &self,
        _latitude: f64,
        _longitude: f64,
    ) -> Result<WeatherSnapshot, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::network_timeout("https://forecast.example"));
        }
        Ok(WeatherSnapshot {
            current: Some(CurrentConditions {
                temperature_2m: Some(26.3),
                relative_humidity_2m: Some(70.0),
                apparent_temperature: Some(28.1),
                weather_code: Some(1),
            }),
            ..Default::default()
        })
    }
}

struct MockAlmanac {
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl MockAlmanac {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AlmanacApi for MockAlmanac {
    async fn fetch_almanac(
        &self,
        _year: i32,
        _month: u32,
        _day: u32,
    ) -> Result<AlmanacSnapshot, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::api_server_error(500, "boom", "https://almanac.example"));
        }
        Ok(AlmanacSnapshot {
            nyue: Some("臘月".to_string()),
            nri: Some("初五".to_string()),
            jieqi: Some("小寒".to_string()),
            yi: Some("祭祀|開市".to_string()),
            ji: Some("嫁娶".to_string()),
            ..Default::default()
        })
    }
}

type TestDashboard<'a> = Dashboard<&'a MockGeocoder, &'a MockForecast, &'a MockAlmanac>;

struct Fixture {
    _dir: tempfile::TempDir,
    geocoder: MockGeocoder,
    forecast: MockForecast,
    almanac: MockAlmanac,
    store_path: std::path::PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        let store_path = dir.path().join("store.json");
        Self {
            _dir: dir,
            geocoder: MockGeocoder::new(),
            forecast: MockForecast::new(),
            almanac: MockAlmanac::new(),
            store_path,
        }
    }

    fn dashboard(&self) -> TestDashboard<'_> {
        Dashboard::new(
            KvStore::open(&self.store_path),
            &self.geocoder,
            &self.forecast,
            &self.almanac,
            YiJiTermIndex::load_bundled().unwrap(),
            None,
        )
    }
}

fn ctx_zh() -> RefreshContext {
    RefreshContext::new(Lang::Zh, None)
}

#[tokio::test]
async fn test_full_refresh_populates_both_caches() {
    let fixture = Fixture::new();
    let dashboard = fixture.dashboard();
    let ctx = ctx_zh();
    let now = Utc.with_ymd_and_hms(2025, 1, 5, 4, 0, 0).unwrap();

    let summary = dashboard.refresh_all(&ctx, now).await.unwrap();

    assert_eq!(summary.weather.state, WeatherFeedState::Fresh);
    assert!(summary.weather.view.is_some());
    assert!(matches!(summary.almanac, AlmanacOutcome::Fresh(_)));

    // The default location resolves through the bundled gazetteer, so no
    // geocoding request went out
    assert_eq!(fixture.geocoder.call_count(), 0);
    assert_eq!(fixture.forecast.call_count(), 1);
    assert_eq!(fixture.almanac.call_count(), 1);

    let store = KvStore::open(&fixture.store_path);
    let weather: WeatherCacheEnvelope = store
        .get(&weather_cache_key(Lang::Zh, &ctx.raw_location))
        .unwrap();
    assert_eq!(weather.timestamp_ms, now.timestamp_millis());
    assert_eq!(weather.meta.location, ctx.raw_location);

    let almanac: AlmanacCacheEnvelope = store.get("almanac:daily").unwrap();
    assert_eq!(almanac.calendar_date_key, "2025-01-05");
}

#[tokio::test]
async fn test_second_refresh_within_ttl_serves_cache() {
    let fixture = Fixture::new();
    let dashboard = fixture.dashboard();
    let ctx = ctx_zh();
    let now = Utc.with_ymd_and_hms(2025, 1, 5, 4, 0, 0).unwrap();

    dashboard.refresh_all(&ctx, now).await.unwrap();

    // One hour later, well inside both freshness windows
    let later = now + chrono::Duration::hours(1);
    let summary = dashboard.refresh_all(&ctx, later).await.unwrap();

    assert_eq!(summary.weather.state, WeatherFeedState::Cached);
    assert_eq!(summary.weather.updated_at_ms, Some(now.timestamp_millis()));
    assert!(matches!(summary.almanac, AlmanacOutcome::Cached(_)));

    assert_eq!(fixture.forecast.call_count(), 1);
    assert_eq!(fixture.almanac.call_count(), 1);
}

#[tokio::test]
async fn test_weather_refetches_after_ttl_expires() {
    let fixture = Fixture::new();
    let dashboard = fixture.dashboard();
    let ctx = ctx_zh();
    let now = Utc.with_ymd_and_hms(2025, 1, 5, 4, 0, 0).unwrap();

    dashboard.refresh_all(&ctx, now).await.unwrap();

    let later = now + chrono::Duration::hours(2);
    let outcome = dashboard.refresh_weather_only(&ctx, later).await.unwrap();
    assert_eq!(outcome.state, WeatherFeedState::Fresh);
    assert_eq!(fixture.forecast.call_count(), 2);
}

#[tokio::test]
async fn test_overlapping_cycles_run_exactly_one_fetch_sequence() {
    let fixture = Fixture::new();
    let dashboard = fixture.dashboard();
    let ctx = ctx_zh();
    let now = Utc.with_ymd_and_hms(2025, 1, 5, 4, 0, 0).unwrap();

    // Two concurrent full cycles: the busy flag drops the second one
    let (first, second) = tokio::join!(
        dashboard.refresh_all(&ctx, now),
        dashboard.refresh_all(&ctx, now),
    );

    let completed = [&first, &second].iter().filter(|r| r.is_some()).count();
    assert_eq!(completed, 1, "exactly one cycle may run");
    assert_eq!(fixture.forecast.call_count(), 1);
    assert_eq!(fixture.almanac.call_count(), 1);
}

#[tokio::test]
async fn test_weather_only_and_full_cycle_do_not_overlap() {
    let fixture = Fixture::new();
    let dashboard = fixture.dashboard();
    let ctx = ctx_zh();
    let now = Utc.with_ymd_and_hms(2025, 1, 5, 4, 0, 0).unwrap();

    let (full, weather_only) = tokio::join!(
        dashboard.refresh_all(&ctx, now),
        dashboard.refresh_weather_only(&ctx, now),
    );

    assert_eq!(
        [full.is_some(), weather_only.is_some()]
            .iter()
            .filter(|b| **b)
            .count(),
        1
    );
    assert_eq!(fixture.forecast.call_count(), 1);
}

#[tokio::test]
async fn test_rollover_triggers_exactly_one_almanac_refetch() {
    let fixture = Fixture::new();
    let dashboard = fixture.dashboard();
    let ctx = ctx_zh();

    // Seed the almanac slot with yesterday's envelope
    let store = KvStore::open(&fixture.store_path);
    store.set(
        "almanac:daily",
        &AlmanacCacheEnvelope {
            calendar_date_key: "2025-01-05".to_string(),
            saved_at_ms: 0,
            snapshot: AlmanacSnapshot::default(),
        },
    );

    // 23:59 Taipei on Jan 5: initializes the last-seen date key
    let before_midnight = Utc.with_ymd_and_hms(2025, 1, 5, 15, 59, 0).unwrap();
    assert!(dashboard.rollover_tick(&ctx, before_midnight).await.is_none());
    assert_eq!(fixture.almanac.call_count(), 0);

    // 00:05 Taipei on Jan 6: the day changed, one refetch fires
    let after_midnight = Utc.with_ymd_and_hms(2025, 1, 5, 16, 5, 0).unwrap();
    let outcome = dashboard.rollover_tick(&ctx, after_midnight).await;
    assert!(matches!(outcome, Some(AlmanacOutcome::Fresh(_))));
    assert_eq!(fixture.almanac.call_count(), 1);

    // The stored envelope was overwritten with today's key
    let envelope: AlmanacCacheEnvelope = store.get("almanac:daily").unwrap();
    assert_eq!(envelope.calendar_date_key, "2025-01-06");

    // Ticks later the same day do nothing further
    let later = after_midnight + chrono::Duration::seconds(120);
    assert!(dashboard.rollover_tick(&ctx, later).await.is_none());
    assert_eq!(fixture.almanac.call_count(), 1);
}

#[tokio::test]
async fn test_resume_forces_rollover_check_and_weather_refresh() {
    let fixture = Fixture::new();
    let dashboard = fixture.dashboard();
    let ctx = ctx_zh();

    let before_midnight = Utc.with_ymd_and_hms(2025, 1, 5, 15, 59, 30).unwrap();
    assert!(dashboard.rollover_tick(&ctx, before_midnight).await.is_none());

    // 30 seconds later the day has rolled over; the throttle would
    // swallow a normal tick, but resume bypasses it
    let resumed_at = before_midnight + chrono::Duration::seconds(30);
    let (almanac, weather) = dashboard.on_resume(&ctx, resumed_at).await;

    assert!(matches!(almanac, Some(AlmanacOutcome::Fresh(_))));
    assert!(weather.is_some());
    assert_eq!(fixture.almanac.call_count(), 1);
    assert_eq!(fixture.forecast.call_count(), 1);
}

#[tokio::test]
async fn test_forecast_failure_degrades_to_unavailable() {
    let fixture = Fixture::new();
    fixture.forecast.fail.store(true, Ordering::SeqCst);
    let dashboard = fixture.dashboard();
    let ctx = ctx_zh();
    let now = Utc.with_ymd_and_hms(2025, 1, 5, 4, 0, 0).unwrap();

    let outcome = dashboard.refresh_weather_only(&ctx, now).await.unwrap();
    assert_eq!(outcome.state, WeatherFeedState::Unavailable);
    assert!(outcome.view.is_none());
    assert!(!outcome.location.resolved);

    // Nothing was cached for the failed fetch
    let store = KvStore::open(&fixture.store_path);
    assert!(
        store
            .get::<WeatherCacheEnvelope>(&weather_cache_key(Lang::Zh, &ctx.raw_location))
            .is_none()
    );
}

#[tokio::test]
async fn test_almanac_failure_keeps_previous_envelope() {
    let fixture = Fixture::new();
    fixture.almanac.fail.store(true, Ordering::SeqCst);
    let dashboard = fixture.dashboard();
    let ctx = ctx_zh();

    // Yesterday's envelope is stale but must survive the failed refetch
    let store = KvStore::open(&fixture.store_path);
    store.set(
        "almanac:daily",
        &AlmanacCacheEnvelope {
            calendar_date_key: "2025-01-04".to_string(),
            saved_at_ms: 42,
            snapshot: AlmanacSnapshot {
                nyue: Some("臘月".to_string()),
                ..Default::default()
            },
        },
    );

    let now = Utc.with_ymd_and_hms(2025, 1, 5, 4, 0, 0).unwrap();
    let outcome = dashboard.refresh_almanac_only(&ctx, now).await.unwrap();
    assert!(matches!(outcome, AlmanacOutcome::KeptPrevious));

    let envelope: AlmanacCacheEnvelope = store.get("almanac:daily").unwrap();
    assert_eq!(envelope.calendar_date_key, "2025-01-04");
    assert_eq!(envelope.saved_at_ms, 42);
}

#[tokio::test]
async fn test_snapshot_from_caches_serves_stale_weather() {
    let fixture = Fixture::new();
    let dashboard = fixture.dashboard();
    let ctx = ctx_zh();
    let now = Utc.with_ymd_and_hms(2025, 1, 5, 4, 0, 0).unwrap();

    dashboard.refresh_all(&ctx, now).await.unwrap();

    // A day later both envelopes are stale, but the fast paint still
    // serves them without touching the network
    let much_later = now + chrono::Duration::days(1);
    let cached = dashboard.snapshot_from_caches(&ctx, much_later);

    let weather = cached.weather.unwrap();
    assert_eq!(weather.updated_at_ms, now.timestamp_millis());
    assert_eq!(weather.view.temperature_c, Some(26));
    assert!(cached.almanac.is_some());

    assert_eq!(fixture.forecast.call_count(), 1);
    assert_eq!(fixture.almanac.call_count(), 1);
}

#[tokio::test]
async fn test_language_switch_does_not_reuse_other_language_cache() {
    let fixture = Fixture::new();
    let dashboard = fixture.dashboard();
    let now = Utc.with_ymd_and_hms(2025, 1, 5, 4, 0, 0).unwrap();

    let ctx_zh = RefreshContext::new(Lang::Zh, Some("台北市信義區"));
    dashboard.refresh_all(&ctx_zh, now).await.unwrap();
    assert_eq!(fixture.forecast.call_count(), 1);

    // Same place, different language: a separate cache slot, so the
    // weather is fetched again instead of reusing the zh envelope
    let ctx_en = RefreshContext::new(Lang::En, Some("台北市信義區"));
    let outcome = dashboard
        .refresh_weather_only(&ctx_en, now + chrono::Duration::minutes(1))
        .await
        .unwrap();
    assert_eq!(outcome.state, WeatherFeedState::Fresh);
    assert_eq!(fixture.forecast.call_count(), 2);
}
