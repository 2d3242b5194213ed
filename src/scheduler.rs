//! Aligned refresh scheduling.
//!
//! Two independent cadences: weather ticks aligned to even wall-clock
//! hours (then repeating at a fixed 2-hour period, not re-aligned), and a
//! throttled day-rollover poll comparing the target timezone's calendar
//! date against the last-seen key. "Time until the next aligned tick" is a
//! pure function; the driver loop just sleeps for whatever it returns.

use chrono::{DateTime, TimeZone, Timelike, Utc};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::almanac::AlmanacApi;
use crate::app::{Dashboard, RefreshContext};
use crate::cache::taipei_date_key;
use crate::constants::cadence;
use crate::geo::GeocodingApi;
use crate::weather::ForecastApi;

/// Next even wall-clock hour strictly after `now` (00:00, 02:00, 04:00, …)
pub fn next_aligned_even_hour<Tz: TimeZone>(now: DateTime<Tz>) -> DateTime<Tz> {
    let truncated = now
        .with_minute(0)
        .and_then(|d| d.with_second(0))
        .and_then(|d| d.with_nanosecond(0))
        .unwrap();

    let next = truncated + chrono::Duration::hours(1);
    if next.hour() % 2 == 1 {
        next + chrono::Duration::hours(1)
    } else {
        next
    }
}

/// Sleep duration until the next aligned weather tick
pub fn time_until_next_aligned_tick<Tz: TimeZone>(now: DateTime<Tz>) -> Duration {
    let next = next_aligned_even_hour(now.clone());
    (next - now).to_std().unwrap_or(Duration::ZERO)
}

/// A detected calendar-day change in the target timezone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayRollover {
    pub from: String,
    pub to: String,
}

/// Tracks the last-seen Taipei date key and throttles rollover polling to
/// once per minute. A forced check (resume trigger) bypasses the throttle.
#[derive(Debug, Default)]
pub struct RolloverGuard {
    last_date_key: Option<String>,
    last_check_ms: i64,
}

impl RolloverGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare today's date key against the last-seen one. Returns the
    /// rollover when the day changed; the first call only initializes the
    /// key and never reports a rollover.
    pub fn check(&mut self, now_utc: DateTime<Utc>, force: bool) -> Option<DayRollover> {
        let now_ms = now_utc.timestamp_millis();
        if !force && now_ms - self.last_check_ms < cadence::ROLLOVER_CHECK_MIN_INTERVAL_MS {
            return None;
        }
        self.last_check_ms = now_ms;

        let today = taipei_date_key(now_utc);
        match self.last_date_key.replace(today.clone()) {
            None => None,
            Some(previous) if previous == today => None,
            Some(previous) => Some(DayRollover {
                from: previous,
                to: today,
            }),
        }
    }
}

/// Drive both cadences forever. Each tick's work is already fail-soft
/// inside the dashboard, so one failed tick never cancels the loop.
pub async fn run_scheduler<G, F, A>(dashboard: &Dashboard<G, F, A>, ctx: &RefreshContext)
where
    G: GeocodingApi,
    F: ForecastApi,
    A: AlmanacApi,
{
    let delay = time_until_next_aligned_tick(chrono::Local::now());
    info!("Aligned schedule armed: first weather tick in {delay:?}");

    let weather_sleep = tokio::time::sleep(delay);
    tokio::pin!(weather_sleep);

    let mut clock = tokio::time::interval(Duration::from_secs(cadence::CLOCK_TICK_SECONDS));
    clock.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut weather_sleep => {
                match dashboard.refresh_weather_only(ctx, Utc::now()).await {
                    Some(outcome) => info!(
                        "Aligned weather tick done: state={:?}",
                        outcome.state
                    ),
                    None => warn!("Aligned weather tick skipped (refresh in flight)"),
                }
                weather_sleep.as_mut().reset(
                    tokio::time::Instant::now()
                        + Duration::from_secs(cadence::WEATHER_PERIOD_SECONDS),
                );
            }
            _ = clock.tick() => {
                if let Some(outcome) = dashboard.rollover_tick(ctx, Utc::now()).await {
                    info!("Rollover almanac refresh done: {}", outcome.describe());
                }
            }
        }
    }
}
