//! Weather forecast fetching and view building.
//!
//! The fetcher is independent of language and location resolution once
//! coordinates are known: it asks the forecast endpoint for current
//! conditions, today's daily aggregates and an hourly temperature series,
//! all in the fixed target timezone.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::constants::{TZ_NAME, view};
use crate::error::AppError;
use crate::i18n::{Lang, weather_description};
use crate::net::fetch_json;

/// Upstream forecast payload. Fields the dashboard does not read are
/// dropped on deserialization; all read fields are optional so a partial
/// payload renders partially instead of failing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    #[serde(default)]
    pub current: Option<CurrentConditions>,
    #[serde(default)]
    pub daily: Option<DailyAggregates>,
    #[serde(default)]
    pub hourly: Option<HourlySeries>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurrentConditions {
    #[serde(default)]
    pub temperature_2m: Option<f64>,
    #[serde(default)]
    pub relative_humidity_2m: Option<f64>,
    #[serde(default)]
    pub apparent_temperature: Option<f64>,
    #[serde(default)]
    pub weather_code: Option<u16>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyAggregates {
    #[serde(default)]
    pub temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    pub temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation_probability_max: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HourlySeries {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub temperature_2m: Vec<Option<f64>>,
}

/// Forecast-by-coordinates seam; tests substitute counting mocks
pub trait ForecastApi {
    fn fetch_forecast(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> impl Future<Output = Result<WeatherSnapshot, AppError>>;
}

impl<F: ForecastApi> ForecastApi for &F {
    async fn fetch_forecast(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherSnapshot, AppError> {
        (**self).fetch_forecast(latitude, longitude).await
    }
}

/// Open-Meteo forecast backend
#[derive(Debug, Clone)]
pub struct OpenMeteoForecast {
    client: reqwest::Client,
    base_url: String,
}

impl OpenMeteoForecast {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

impl ForecastApi for OpenMeteoForecast {
    async fn fetch_forecast(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherSnapshot, AppError> {
        let latitude = latitude.to_string();
        let longitude = longitude.to_string();
        let params = [
            ("latitude", latitude.as_str()),
            ("longitude", longitude.as_str()),
            ("timezone", TZ_NAME),
            ("forecast_days", "1"),
            ("temperature_unit", "celsius"),
            (
                "current",
                "temperature_2m,relative_humidity_2m,apparent_temperature,weather_code",
            ),
            (
                "daily",
                "temperature_2m_max,temperature_2m_min,precipitation_probability_max",
            ),
            ("hourly", "temperature_2m"),
        ];

        let url = reqwest::Url::parse_with_params(&self.base_url, &params)
            .map_err(|e| AppError::InvalidUrl(format!("{}: {e}", self.base_url)))?;

        fetch_json(&self.client, url.as_str()).await
    }
}

/// Render-ready weather summary handed to the render collaborator
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherView {
    pub description: String,
    pub emoji: &'static str,
    pub temperature_c: Option<i32>,
    pub feels_like_c: Option<i32>,
    pub humidity_pct: Option<i32>,
    pub temp_min_c: Option<i32>,
    pub temp_max_c: Option<i32>,
    pub rain_probability_pct: Option<i32>,
    /// Upcoming hourly temperatures for the sparkline collaborator
    pub trend: Vec<TrendPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendPoint {
    /// Wall-clock hour in the target timezone
    pub time: NaiveDateTime,
    pub temperature_c: f64,
}

fn round0(value: Option<f64>) -> Option<i32> {
    let v = value?;
    if !v.is_finite() {
        return None;
    }
    Some(v.round() as i32)
}

/// Emoji for a WMO weather code
pub fn weather_emoji(code: Option<u16>) -> &'static str {
    let Some(c) = code else {
        return "🌤️";
    };

    match c {
        0 => "☀️",
        1 => "🌤️",
        2 => "⛅",
        3 => "☁️",
        45 | 48 => "🌫️",
        51..=57 | 61..=67 | 80..=82 => "🌧️",
        71..=77 | 85 | 86 => "🌨️",
        95 | 96 | 99 => "⛈️",
        _ => "🌤️",
    }
}

/// Build the render-ready view for a snapshot. `now_local` is the current
/// time in the target timezone, used to pick the upcoming hours of the
/// temperature trend.
pub fn build_weather_view(
    lang: Lang,
    snapshot: &WeatherSnapshot,
    now_local: DateTime<FixedOffset>,
) -> WeatherView {
    let current = snapshot.current.clone().unwrap_or_default();
    let daily = snapshot.daily.clone().unwrap_or_default();

    let first = |series: &Vec<Option<f64>>| series.first().copied().flatten();

    WeatherView {
        description: weather_description(lang, current.weather_code).to_string(),
        emoji: weather_emoji(current.weather_code),
        temperature_c: round0(current.temperature_2m),
        feels_like_c: round0(current.apparent_temperature),
        humidity_pct: round0(current.relative_humidity_2m),
        temp_min_c: round0(first(&daily.temperature_2m_min)),
        temp_max_c: round0(first(&daily.temperature_2m_max)),
        rain_probability_pct: round0(first(&daily.precipitation_probability_max)),
        trend: trend_points(snapshot, now_local),
    }
}

/// Collect the next few hourly temperatures at or after `now_local`.
/// Fewer than two usable points yields an empty trend.
fn trend_points(snapshot: &WeatherSnapshot, now_local: DateTime<FixedOffset>) -> Vec<TrendPoint> {
    let Some(hourly) = &snapshot.hourly else {
        return Vec::new();
    };

    let now_naive = now_local.naive_local();
    let mut points = Vec::new();

    for (time, temperature) in hourly.time.iter().zip(hourly.temperature_2m.iter()) {
        // Hourly timestamps arrive as "2026-01-06T14:00" in the target
        // timezone; unparsable entries are skipped
        let Ok(t) = NaiveDateTime::parse_from_str(time, "%Y-%m-%dT%H:%M") else {
            continue;
        };
        let Some(temperature) = temperature else {
            continue;
        };
        if t >= now_naive {
            points.push(TrendPoint {
                time: t,
                temperature_c: *temperature,
            });
        }
        if points.len() >= view::TREND_HOURS {
            break;
        }
    }

    if points.len() < 2 {
        return Vec::new();
    }
    points
}
