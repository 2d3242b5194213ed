// src/main.rs
mod almanac;
mod app;
mod cache;
mod cli;
mod commands;
mod config;
mod constants;
mod error;
mod geo;
mod i18n;
mod logging;
mod net;
mod scheduler;
mod weather;

use chrono::Utc;
use clap::Parser;
use tracing::info;

use almanac::{AlmanacView, CalendarApi, terms::YiJiTermIndex};
use app::{AlmanacOutcome, CachedSnapshots, Dashboard, RefreshContext, WeatherOutcome};
use cache::{KvStore, taipei_time};
use cli::Args;
use commands::handle_config_commands;
use config::Config;
use error::AppError;
use geo::OpenMeteoGeocoding;
use i18n::{Lang, MessageKey, t};
use net::create_http_client_with_timeout;
use weather::{OpenMeteoForecast, WeatherView};

fn format_updated_at(lang: Lang, timestamp_ms: i64) -> String {
    let time = chrono::DateTime::from_timestamp_millis(timestamp_ms)
        .map(taipei_time)
        .map(|local| local.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string());
    format!("{}{time}", t(lang, MessageKey::LabelUpdated, &[]))
}

fn print_weather_view(lang: Lang, view: &WeatherView, updated_at_ms: Option<i64>) {
    let degrees = |v: Option<i32>| v.map(|n| format!("{n}°C")).unwrap_or_else(|| "--°C".to_string());
    let percent = |v: Option<i32>| v.map(|n| format!("{n}%")).unwrap_or_else(|| "--%".to_string());

    println!("  {} {}", view.emoji, view.description);
    println!(
        "  {}  ({})",
        degrees(view.temperature_c),
        view.feels_like_c
            .map(|v| t(lang, MessageKey::WeatherFeels, &[("v", &v.to_string())]))
            .unwrap_or_else(|| "--".to_string()),
    );
    println!(
        "  {} ~ {}   {}  {}",
        degrees(view.temp_min_c),
        degrees(view.temp_max_c),
        percent(view.rain_probability_pct),
        percent(view.humidity_pct),
    );
    if let Some(ts) = updated_at_ms {
        println!("  {}", format_updated_at(lang, ts));
    }
}

fn print_weather_outcome(lang: Lang, outcome: &WeatherOutcome) {
    println!("{}", outcome.location.weather_hint);
    match &outcome.view {
        Some(view) => print_weather_view(lang, view, outcome.updated_at_ms),
        None => println!("  {}", t(lang, MessageKey::WeatherNa, &[])),
    }
}

fn print_almanac_view(lang: Lang, view: &AlmanacView) {
    println!(
        "{}{}  {}{}",
        t(lang, MessageKey::LunarDatePrefix, &[]),
        view.lunar_date_text,
        t(lang, MessageKey::SolarTermPrefix, &[]),
        view.solar_term_text,
    );
    println!(
        "  {}: {}",
        t(lang, MessageKey::LunarYi, &[]),
        view.auspicious_terms.join("、"),
    );
    println!(
        "  {}: {}",
        t(lang, MessageKey::LunarJi, &[]),
        view.inauspicious_terms.join("、"),
    );
}

fn print_cached_snapshots(lang: Lang, cached: &CachedSnapshots) {
    if cached.weather.is_none() && cached.almanac.is_none() {
        return;
    }
    println!("--- cached ---");
    if let Some(weather) = &cached.weather {
        print_weather_view(lang, &weather.view, Some(weather.updated_at_ms));
    }
    if let Some(almanac) = &cached.almanac {
        print_almanac_view(lang, almanac);
    }
    println!("--------------");
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = Args::parse();

    // Set up logging to both console and file; the guard must stay alive
    // so logs are flushed on exit
    let (log_file_path, _guard) = logging::setup_logging(&args).await?;
    info!("Logs written to {log_file_path}");

    if handle_config_commands(&args).await? {
        return Ok(());
    }

    let config = Config::load().await?;
    let client = create_http_client_with_timeout(config.http_timeout_seconds)?;

    let lang = Lang::from_code(&args.lang);
    let ctx = RefreshContext::new(lang, args.location.as_deref());
    info!("Dashboard starting: lang={lang}, loc={}", ctx.raw_location);

    let dashboard = Dashboard::new(
        KvStore::open(config.effective_store_path()),
        OpenMeteoGeocoding::new(client.clone(), &config.geocoding_url),
        OpenMeteoForecast::new(client.clone(), &config.forecast_url),
        CalendarApi::new(client, &config.almanac_url, &config.almanac_api_key),
        YiJiTermIndex::load_bundled()?,
        config.gazetteer_path.clone().map(Into::into),
    );

    // Paint from caches first so the dashboard shows something before the
    // first network round-trip completes
    let cached = dashboard.snapshot_from_caches(&ctx, Utc::now());
    print_cached_snapshots(lang, &cached);

    if let Some(summary) = dashboard.refresh_all(&ctx, Utc::now()).await {
        println!("{}", summary.weather.location.footer);
        print_weather_outcome(lang, &summary.weather);
        match &summary.almanac {
            AlmanacOutcome::Fresh(view) | AlmanacOutcome::Cached(view) => {
                print_almanac_view(lang, view)
            }
            AlmanacOutcome::KeptPrevious => {
                // A transient provider outage must not erase a
                // still-valid-for-today panel
                info!("Almanac unchanged (fetch failed, previous state kept)");
            }
        }
    }

    if args.once {
        return Ok(());
    }

    scheduler::run_scheduler(&dashboard, &ctx).await;
    Ok(())
}
