//! Lunar-almanac fetching and view building.
//!
//! The almanac feed is keyed only by calendar date; the upstream payload is
//! language-independent and language is applied at view-building time.

pub mod terms;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::constants::{api, view};
use crate::error::AppError;
use crate::i18n::Lang;
use crate::net::fetch_json_with_headers;
use terms::{YiJiTermIndex, translate_jieqi};

/// Response envelope of the almanac endpoint. A missing success code or
/// missing data payload is a malformed response.
#[derive(Debug, Clone, Deserialize)]
pub struct AlmanacResponse {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<AlmanacSnapshot>,
}

/// Daily almanac payload: lunar date fields, solar-term name and
/// pipe-delimited yi/ji term lists
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlmanacSnapshot {
    /// Lunar month name, e.g. 臘月
    #[serde(default)]
    pub nyue: Option<String>,
    /// Lunar day name, e.g. 初五
    #[serde(default)]
    pub nri: Option<String>,
    /// Solar term in effect, if any
    #[serde(default)]
    pub jieqi: Option<String>,
    /// Pipe-delimited auspicious terms
    #[serde(default)]
    pub yi: Option<String>,
    /// Pipe-delimited inauspicious terms
    #[serde(default)]
    pub ji: Option<String>,
    /// Numeric lunar year/month/day, used for the English date line
    #[serde(default, rename = "YIYEAR", deserialize_with = "de_flexible_i64")]
    pub yi_year: Option<i64>,
    #[serde(default, rename = "YIMONTH", deserialize_with = "de_flexible_i64")]
    pub yi_month: Option<i64>,
    #[serde(default, rename = "YIDAY", deserialize_with = "de_flexible_i64")]
    pub yi_day: Option<i64>,
}

/// Accept a number or numeric string; anything else becomes `None`
fn de_flexible_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }))
}

/// Almanac-by-date seam; tests substitute counting mocks
pub trait AlmanacApi {
    fn fetch_almanac(
        &self,
        year: i32,
        month: u32,
        day: u32,
    ) -> impl Future<Output = Result<AlmanacSnapshot, AppError>>;
}

impl<A: AlmanacApi> AlmanacApi for &A {
    async fn fetch_almanac(
        &self,
        year: i32,
        month: u32,
        day: u32,
    ) -> Result<AlmanacSnapshot, AppError> {
        (**self).fetch_almanac(year, month, day).await
    }
}

/// Production almanac backend, authenticated with a fixed API key header
#[derive(Debug, Clone)]
pub struct CalendarApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl CalendarApi {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

impl AlmanacApi for CalendarApi {
    async fn fetch_almanac(
        &self,
        year: i32,
        month: u32,
        day: u32,
    ) -> Result<AlmanacSnapshot, AppError> {
        let year = year.to_string();
        let month = month.to_string();
        let day = day.to_string();
        let params = [
            ("year", year.as_str()),
            ("month", month.as_str()),
            ("day", day.as_str()),
        ];

        let url = reqwest::Url::parse_with_params(&self.base_url, &params)
            .map_err(|e| AppError::InvalidUrl(format!("{}: {e}", self.base_url)))?;

        let headers = [
            (api::ALMANAC_API_KEY_HEADER, self.api_key.as_str()),
            ("Accept", "application/json"),
        ];
        let response: AlmanacResponse =
            fetch_json_with_headers(&self.client, url.as_str(), &headers).await?;

        debug!(
            "Almanac response: code={:?}, message={:?}",
            response.code, response.message
        );

        match response {
            AlmanacResponse {
                code: Some(200),
                data: Some(snapshot),
                ..
            } => Ok(snapshot),
            _ => Err(AppError::api_unexpected_structure(
                "almanac response missing success code or data payload",
                url.as_str(),
            )),
        }
    }
}

/// Split a pipe-delimited term-list field into trimmed tokens
pub fn split_pipe_terms(text: &str) -> Vec<String> {
    text.split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Truncate a term list, marking the cut with an ellipsis item
fn clamp_list(mut items: Vec<String>, max_items: usize) -> Vec<String> {
    if items.len() <= max_items {
        return items;
    }
    items.truncate(max_items);
    items.push("…".to_string());
    items
}

/// Render-ready almanac panel handed to the render collaborator
#[derive(Debug, Clone, PartialEq)]
pub struct AlmanacView {
    pub lunar_date_text: String,
    pub solar_term_text: String,
    pub auspicious_terms: Vec<String>,
    pub inauspicious_terms: Vec<String>,
}

/// Build the render-ready almanac view: lunar date line, translated solar
/// term, translated and clamped yi/ji lists.
pub fn build_almanac_view(
    lang: Lang,
    snapshot: &AlmanacSnapshot,
    terms: &YiJiTermIndex,
) -> AlmanacView {
    let zh_date_text = format!(
        "{} {}",
        snapshot.nyue.as_deref().unwrap_or(""),
        snapshot.nri.as_deref().unwrap_or("")
    )
    .trim()
    .to_string();

    let lunar_date_text = match (lang, snapshot.yi_year, snapshot.yi_month, snapshot.yi_day) {
        (Lang::En, Some(y), Some(m), Some(d)) => format!("Year {y}, Month {m}, Day {d}"),
        _ => zh_date_text,
    };

    let solar_term_text = translate_jieqi(lang, snapshot.jieqi.as_deref().unwrap_or(""));

    let translate_all = |field: &Option<String>| {
        let tokens = split_pipe_terms(field.as_deref().unwrap_or(""));
        let translated: Vec<String> = tokens
            .iter()
            .map(|token| terms.translate(lang, token))
            .filter(|s| !s.is_empty())
            .collect();
        clamp_list(translated, view::YIJI_CLAMP)
    };

    AlmanacView {
        lunar_date_text,
        solar_term_text,
        auspicious_terms: translate_all(&snapshot.yi),
        inauspicious_terms: translate_all(&snapshot.ji),
    }
}
