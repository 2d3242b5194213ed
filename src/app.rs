//! Dashboard orchestration: refresh cycles, the busy-flag overlap guard
//! and the render-from-cache fast path.
//!
//! All mutable refresh state lives in this context object and is threaded
//! explicitly through each operation; there are no module-level globals.
//! The upstream backends sit behind traits so tests can count calls at the
//! fetch boundary.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, instrument, warn};

use crate::almanac::{
    AlmanacApi, AlmanacView, build_almanac_view, terms::YiJiTermIndex,
};
use crate::cache::{
    AlmanacCacheEnvelope, KvStore, WeatherCacheEnvelope, WeatherCacheMeta, almanac_cache_key,
    needs_almanac_refresh, needs_weather_refresh, taipei_date_key, taipei_time, taipei_ymd,
    weather_cache_key,
};
use crate::geo::{Gazetteer, GeocodingApi, LocationQuery, resolve};
use crate::i18n::{Lang, MessageKey, t};
use crate::scheduler::RolloverGuard;
use crate::weather::{ForecastApi, WeatherView, build_weather_view};

/// Per-cycle refresh input: declared language plus the trimmed,
/// whitespace-collapsed location string
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshContext {
    pub language: Lang,
    pub raw_location: String,
}

impl RefreshContext {
    /// Build a context from caller input; a missing or empty location
    /// falls back to the language-specific default.
    pub fn new(language: Lang, raw_location: Option<&str>) -> Self {
        let query = LocationQuery::new(language, raw_location.unwrap_or(""));
        Self {
            language: query.language,
            raw_location: query.raw_text,
        }
    }
}

/// Location strings for the footer and the weather panel hint
#[derive(Debug, Clone, PartialEq)]
pub struct LocationTexts {
    pub footer: String,
    pub weather_hint: String,
    /// False renders the "unresolved" hint variant
    pub resolved: bool,
}

pub fn location_texts(lang: Lang, location: &str, resolved: bool) -> LocationTexts {
    let vars = [("loc", location)];
    let hint_key = if resolved {
        MessageKey::LocationWeatherHint
    } else {
        MessageKey::LocationWeatherHintFail
    };
    LocationTexts {
        footer: t(lang, MessageKey::LocationFooter, &vars),
        weather_hint: t(lang, hint_key, &vars),
        resolved,
    }
}

/// How the weather panel got its data this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherFeedState {
    /// Fetched from upstream just now
    Fresh,
    /// Served from an unexpired cache envelope, no network
    Cached,
    /// Resolution or fetch failed; render the explicit no-data state
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct WeatherOutcome {
    pub state: WeatherFeedState,
    pub view: Option<WeatherView>,
    pub updated_at_ms: Option<i64>,
    pub location: LocationTexts,
}

/// How the almanac panel got its data this cycle
#[derive(Debug, Clone)]
pub enum AlmanacOutcome {
    /// Fetched from upstream just now
    Fresh(AlmanacView),
    /// Stored envelope still matches today's date
    Cached(AlmanacView),
    /// Fetch failed; the previous rendered state stays on screen rather
    /// than being overwritten with placeholders
    KeptPrevious,
}

impl AlmanacOutcome {
    pub fn view(&self) -> Option<&AlmanacView> {
        match self {
            AlmanacOutcome::Fresh(view) | AlmanacOutcome::Cached(view) => Some(view),
            AlmanacOutcome::KeptPrevious => None,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            AlmanacOutcome::Fresh(_) => "fresh",
            AlmanacOutcome::Cached(_) => "cached",
            AlmanacOutcome::KeptPrevious => "kept-previous",
        }
    }
}

/// Result of a full refresh cycle
#[derive(Debug, Clone)]
pub struct RefreshSummary {
    pub weather: WeatherOutcome,
    pub almanac: AlmanacOutcome,
}

/// Cached weather panel state, possibly stale; rendered before the first
/// refresh completes
#[derive(Debug, Clone)]
pub struct CachedWeather {
    pub view: WeatherView,
    pub updated_at_ms: i64,
}

/// Whatever the caches can paint right now, without any network
#[derive(Debug, Clone)]
pub struct CachedSnapshots {
    pub weather: Option<CachedWeather>,
    pub almanac: Option<AlmanacView>,
}

/// Clears the busy flag when a refresh cycle ends, normally or not
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The dashboard core. Owns the persistent store, the static resources
/// and the upstream backends; drives every fetch.
pub struct Dashboard<G, F, A> {
    store: KvStore,
    geocoder: G,
    forecast: F,
    almanac: A,
    terms: YiJiTermIndex,
    gazetteer: OnceCell<Gazetteer>,
    gazetteer_path: Option<PathBuf>,
    busy: AtomicBool,
    rollover: Mutex<RolloverGuard>,
}

impl<G, F, A> Dashboard<G, F, A>
where
    G: GeocodingApi,
    F: ForecastApi,
    A: AlmanacApi,
{
    pub fn new(
        store: KvStore,
        geocoder: G,
        forecast: F,
        almanac: A,
        terms: YiJiTermIndex,
        gazetteer_path: Option<PathBuf>,
    ) -> Self {
        Self {
            store,
            geocoder,
            forecast,
            almanac,
            terms,
            gazetteer: OnceCell::new(),
            gazetteer_path,
            busy: AtomicBool::new(false),
            rollover: Mutex::new(RolloverGuard::new()),
        }
    }

    pub fn store(&self) -> &KvStore {
        &self.store
    }

    /// Unknown yi/ji tokens seen this session, for diagnostics
    pub fn unknown_terms(&self) -> Vec<String> {
        self.terms.unknown_terms()
    }

    /// The gazetteer, loaded once; concurrent callers await the same load.
    /// A broken resource degrades to an empty gazetteer so resolution
    /// falls through to remote geocoding.
    async fn gazetteer(&self) -> &Gazetteer {
        self.gazetteer
            .get_or_init(|| async {
                match Gazetteer::load(self.gazetteer_path.as_deref()).await {
                    Ok(gazetteer) => gazetteer,
                    Err(e) => {
                        warn!("Gazetteer load failed, falling back to remote geocoding: {e}");
                        Gazetteer::default()
                    }
                }
            })
            .await
    }

    fn try_busy(&self) -> Option<BusyGuard<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            Some(BusyGuard(&self.busy))
        } else {
            debug!("Refresh skipped (in-flight)");
            None
        }
    }

    /// Refresh the weather panel: serve the cache while fresh, otherwise
    /// resolve the location and fetch a new forecast. Failures degrade to
    /// an explicit no-data outcome; nothing propagates.
    #[instrument(skip(self, ctx, now), fields(lang = %ctx.language, loc = %ctx.raw_location))]
    async fn refresh_weather(&self, ctx: &RefreshContext, now: DateTime<Utc>) -> WeatherOutcome {
        let now_ms = now.timestamp_millis();
        let cache_key = weather_cache_key(ctx.language, &ctx.raw_location);
        let cached: Option<WeatherCacheEnvelope> = self.store.get(&cache_key);

        if !needs_weather_refresh(cached.as_ref(), now_ms)
            && let Some(envelope) = cached
        {
            debug!(
                "Weather cache hit: key={cache_key}, age_ms={}",
                now_ms - envelope.timestamp_ms
            );
            let view = build_weather_view(ctx.language, &envelope.snapshot, taipei_time(now));
            return WeatherOutcome {
                state: WeatherFeedState::Cached,
                view: Some(view),
                updated_at_ms: Some(envelope.timestamp_ms),
                location: location_texts(ctx.language, &ctx.raw_location, true),
            };
        }

        info!("Weather refresh start: key={cache_key}");

        let gazetteer = self.gazetteer().await;
        let geo = match resolve(
            &self.store,
            gazetteer,
            &self.geocoder,
            ctx.language,
            &ctx.raw_location,
            now_ms,
        )
        .await
        {
            Ok(geo) => geo,
            Err(e) => {
                warn!("Weather refresh failed (geocoding): {e}");
                return self.weather_unavailable(ctx);
            }
        };

        let snapshot = match self.forecast.fetch_forecast(geo.latitude, geo.longitude).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Weather refresh failed (forecast): {e}");
                return self.weather_unavailable(ctx);
            }
        };

        self.store.set(
            &cache_key,
            &WeatherCacheEnvelope {
                timestamp_ms: now_ms,
                snapshot: snapshot.clone(),
                meta: WeatherCacheMeta {
                    location: ctx.raw_location.clone(),
                    language: ctx.language,
                    coordinates: geo.coordinates(),
                },
            },
        );

        let view = build_weather_view(ctx.language, &snapshot, taipei_time(now));
        WeatherOutcome {
            state: WeatherFeedState::Fresh,
            view: Some(view),
            updated_at_ms: Some(now_ms),
            location: location_texts(ctx.language, &ctx.raw_location, true),
        }
    }

    fn weather_unavailable(&self, ctx: &RefreshContext) -> WeatherOutcome {
        WeatherOutcome {
            state: WeatherFeedState::Unavailable,
            view: None,
            updated_at_ms: None,
            location: location_texts(ctx.language, &ctx.raw_location, false),
        }
    }

    /// Refresh the almanac panel: serve the cache while the stored date
    /// key matches today, otherwise refetch and overwrite the slot. A
    /// fetch failure keeps the previous rendered state.
    #[instrument(skip(self, ctx, now))]
    async fn refresh_almanac(&self, ctx: &RefreshContext, now: DateTime<Utc>) -> AlmanacOutcome {
        let today = taipei_date_key(now);
        let cached: Option<AlmanacCacheEnvelope> = self.store.get(almanac_cache_key());

        if !needs_almanac_refresh(cached.as_ref(), &today)
            && let Some(envelope) = cached
        {
            debug!("Almanac cache hit: date={}", envelope.calendar_date_key);
            return AlmanacOutcome::Cached(build_almanac_view(
                ctx.language,
                &envelope.snapshot,
                &self.terms,
            ));
        }

        info!("Almanac refresh start (daily): date={today}");

        let (year, month, day) = taipei_ymd(now);
        match self.almanac.fetch_almanac(year, month, day).await {
            Ok(snapshot) => {
                self.store.set(
                    almanac_cache_key(),
                    &AlmanacCacheEnvelope {
                        calendar_date_key: today,
                        saved_at_ms: now.timestamp_millis(),
                        snapshot: snapshot.clone(),
                    },
                );
                AlmanacOutcome::Fresh(build_almanac_view(ctx.language, &snapshot, &self.terms))
            }
            Err(e) => {
                warn!("Almanac refresh failed, keeping previous state: {e}");
                AlmanacOutcome::KeptPrevious
            }
        }
    }

    /// Full refresh cycle: weather and almanac launched together as
    /// independent tasks, completion order unconstrained. Returns `None`
    /// when another cycle is already in flight (the request is dropped,
    /// not queued).
    pub async fn refresh_all(
        &self,
        ctx: &RefreshContext,
        now: DateTime<Utc>,
    ) -> Option<RefreshSummary> {
        let _guard = self.try_busy()?;

        let (weather, almanac) =
            tokio::join!(self.refresh_weather(ctx, now), self.refresh_almanac(ctx, now));

        Some(RefreshSummary { weather, almanac })
    }

    /// Weather-only cycle, busy-guarded like the full cycle
    pub async fn refresh_weather_only(
        &self,
        ctx: &RefreshContext,
        now: DateTime<Utc>,
    ) -> Option<WeatherOutcome> {
        let _guard = self.try_busy()?;
        Some(self.refresh_weather(ctx, now).await)
    }

    /// Almanac-only cycle, busy-guarded like the full cycle
    pub async fn refresh_almanac_only(
        &self,
        ctx: &RefreshContext,
        now: DateTime<Utc>,
    ) -> Option<AlmanacOutcome> {
        let _guard = self.try_busy()?;
        Some(self.refresh_almanac(ctx, now).await)
    }

    /// Throttled rollover poll; refreshes the almanac when the Taipei
    /// calendar day changed since the last check
    pub async fn rollover_tick(
        &self,
        ctx: &RefreshContext,
        now: DateTime<Utc>,
    ) -> Option<AlmanacOutcome> {
        let rollover = self.rollover.lock().await.check(now, false);
        let rollover = rollover?;

        info!("Day rollover detected: {} -> {}", rollover.from, rollover.to);
        self.refresh_almanac_only(ctx, now).await
    }

    /// Resume trigger: a backgrounded session may have missed its aligned
    /// timer entirely, so force a rollover check (bypassing the throttle)
    /// and a weather-only refresh.
    pub async fn on_resume(
        &self,
        ctx: &RefreshContext,
        now: DateTime<Utc>,
    ) -> (Option<AlmanacOutcome>, Option<WeatherOutcome>) {
        info!("Resume trigger at {now}");

        let rollover = self.rollover.lock().await.check(now, true);
        let almanac = match rollover {
            Some(rollover) => {
                info!("Day rollover on resume: {} -> {}", rollover.from, rollover.to);
                self.refresh_almanac_only(ctx, now).await
            }
            None => None,
        };

        let weather = self.refresh_weather_only(ctx, now).await;
        (almanac, weather)
    }

    /// Paint from caches only, without any network: stale weather is
    /// served as-is and the almanac envelope is used regardless of its
    /// date key, so the dashboard shows something immediately on reload.
    pub fn snapshot_from_caches(&self, ctx: &RefreshContext, now: DateTime<Utc>) -> CachedSnapshots {
        let weather = self
            .store
            .get::<WeatherCacheEnvelope>(&weather_cache_key(ctx.language, &ctx.raw_location))
            .map(|envelope| CachedWeather {
                view: build_weather_view(ctx.language, &envelope.snapshot, taipei_time(now)),
                updated_at_ms: envelope.timestamp_ms,
            });

        let almanac = self
            .store
            .get::<AlmanacCacheEnvelope>(almanac_cache_key())
            .map(|envelope| build_almanac_view(ctx.language, &envelope.snapshot, &self.terms));

        CachedSnapshots { weather, almanac }
    }
}
