//! Geocoding resolver: cache, then gazetteer, then remote geocoding with
//! query-candidate rewrites.
//!
//! Candidate attempts are strictly sequential so at most one outbound
//! geocoding request is in flight, and the first finite-coordinate result
//! terminates the search. Every accepted result is cached under the
//! original `(language, rawLocation)` key, not the matched candidate, so
//! repeated queries for the same raw input become cache hits.

use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::gazetteer::Gazetteer;
use super::models::GeoResult;
use crate::cache::{GeoCacheEnvelope, KvStore, geo_cache_entry_valid, geo_cache_key};
use crate::constants::{TZ_NAME, api};
use crate::error::AppError;
use crate::i18n::Lang;
use crate::net::fetch_json;

/// Remote geocoding seam. The production implementation calls the
/// geocoding-by-name endpoint; tests substitute counting mocks.
pub trait GeocodingApi {
    fn search(
        &self,
        name: &str,
        lang: Lang,
        constrain_country: bool,
    ) -> impl Future<Output = Result<GeocodeSearchResponse, AppError>>;
}

impl<G: GeocodingApi> GeocodingApi for &G {
    async fn search(
        &self,
        name: &str,
        lang: Lang,
        constrain_country: bool,
    ) -> Result<GeocodeSearchResponse, AppError> {
        (**self).search(name, lang, constrain_country).await
    }
}

/// Response of the geocoding-by-name endpoint: ranked place candidates
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeocodeSearchResponse {
    #[serde(default)]
    pub results: Vec<GeocodePlace>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeocodePlace {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub admin1: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
}

/// Open-Meteo geocoding backend
#[derive(Debug, Clone)]
pub struct OpenMeteoGeocoding {
    client: reqwest::Client,
    base_url: String,
}

impl OpenMeteoGeocoding {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

impl GeocodingApi for OpenMeteoGeocoding {
    async fn search(
        &self,
        name: &str,
        lang: Lang,
        constrain_country: bool,
    ) -> Result<GeocodeSearchResponse, AppError> {
        let count = api::GEOCODING_RESULT_COUNT.to_string();
        let mut params = vec![
            ("name", name),
            ("count", count.as_str()),
            ("language", lang.code()),
        ];
        if constrain_country {
            params.push(("countryCode", api::GEOCODING_COUNTRY_CODE));
        }

        let url = reqwest::Url::parse_with_params(&self.base_url, &params)
            .map_err(|e| AppError::InvalidUrl(format!("{}: {e}", self.base_url)))?;

        fetch_json(&self.client, url.as_str()).await
    }
}

fn push_candidate(candidates: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }
    if !candidates.iter().any(|c| c == value) {
        candidates.push(value.to_string());
    }
}

/// Strip a leading city name with its optional 市 suffix
fn strip_city_prefix<'a>(s: &'a str, city: &str) -> &'a str {
    match s.strip_prefix(city) {
        Some(rest) => rest.strip_prefix('市').unwrap_or(rest),
        None => s,
    }
}

/// Build the ordered, de-duplicated list of query-candidate strings for
/// remote geocoding. The raw string always comes first; rewrites strip
/// known city prefixes (zh) or comma segments and suffix words (en).
pub fn build_geocode_candidates(lang: Lang, raw_location: &str) -> Vec<String> {
    let raw = raw_location.trim();
    if raw.is_empty() {
        return Vec::new();
    }

    let mut candidates = Vec::new();
    push_candidate(&mut candidates, raw);

    match lang {
        Lang::Zh => {
            let mut s = raw;
            s = strip_city_prefix(s, "新北");
            s = strip_city_prefix(s, "臺北");
            s = strip_city_prefix(s, "台北");
            push_candidate(&mut candidates, s);
            push_candidate(
                &mut candidates,
                s.strip_suffix(['區', '鄉', '鎮', '市']).unwrap_or(s),
            );
        }
        Lang::En => {
            if let Some(first_segment) = raw.split(',').next() {
                push_candidate(&mut candidates, first_segment);
            }
            push_candidate(&mut candidates, &raw.replacen(", New Taipei City", "", 1));
            push_candidate(&mut candidates, &raw.replacen(" District", "", 1));
        }
    }

    candidates
}

/// Resolve a raw location string to coordinates.
///
/// Order, first success wins: unexpired cache entry, gazetteer, then remote
/// geocoding over the candidate list in two passes (country-constrained,
/// then unconstrained). Exhausting every candidate in both passes yields
/// [`AppError::GeocodingNotFound`].
#[instrument(skip(store, gazetteer, geocoder))]
pub async fn resolve<G: GeocodingApi>(
    store: &KvStore,
    gazetteer: &Gazetteer,
    geocoder: &G,
    lang: Lang,
    raw_location: &str,
    now_ms: i64,
) -> Result<GeoResult, AppError> {
    let cache_key = geo_cache_key(lang, raw_location);

    if let Some(envelope) = store.get::<GeoCacheEnvelope>(&cache_key)
        && geo_cache_entry_valid(envelope.saved_at_ms, now_ms)
        && envelope.geo.has_finite_coordinates()
    {
        debug!("Geocode cache hit: key={cache_key}");
        return Ok(envelope.geo);
    }

    if let Some(local) = gazetteer.lookup(raw_location) {
        debug!(
            "Gazetteer hit: {raw_location} -> {}, {}",
            local.admin_area, local.resolved_name
        );
        store.set(&cache_key, &GeoCacheEnvelope::new(local.clone(), now_ms));
        return Ok(local);
    }

    let candidates = build_geocode_candidates(lang, raw_location);

    for constrain_country in [true, false] {
        for name in &candidates {
            debug!("Geocode try: name={name}, constrained={constrain_country}");

            let response = geocoder.search(name, lang, constrain_country).await?;
            let Some(top) = response.results.first() else {
                continue;
            };

            let result = GeoResult {
                latitude: top.latitude.unwrap_or(f64::NAN),
                longitude: top.longitude.unwrap_or(f64::NAN),
                resolved_name: top.name.clone().unwrap_or_else(|| name.clone()),
                admin_area: top.admin1.clone().unwrap_or_default(),
                timezone: top
                    .timezone
                    .clone()
                    .unwrap_or_else(|| TZ_NAME.to_string()),
                country_code: top
                    .country_code
                    .clone()
                    .unwrap_or_else(|| api::GEOCODING_COUNTRY_CODE.to_string()),
                matched_query: name.clone(),
            };

            if !result.has_finite_coordinates() {
                warn!("Geocode result has non-finite coordinates, skipping: {name}");
                continue;
            }

            // Cache under the original raw key, not the matched candidate
            store.set(&cache_key, &GeoCacheEnvelope::new(result.clone(), now_ms));
            return Ok(result);
        }
    }

    Err(AppError::geocoding_not_found(raw_location))
}
