//! Local gazetteer: city/district names (zh and en) to coordinates.
//!
//! Answers location queries with zero network cost. Built once per session
//! from a static JSON resource listing cities, each with districts, each
//! with coordinates and bilingual names. Four indexes are built: exact
//! `(city, district)` and district-only, in each language. District-only
//! matches are ambiguous; the first match in resource order wins.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, instrument};

use super::models::GeoResult;
use crate::constants::TZ_NAME;
use crate::error::AppError;

/// Bundled gazetteer resource
const BUNDLED_GAZETTEER: &str = include_str!("../../data/tw_locations.json");

#[derive(Debug, Deserialize)]
struct CityRecord {
    city: String,
    #[serde(default)]
    city_en: String,
    #[serde(default)]
    districts: Vec<DistrictRecord>,
}

#[derive(Debug, Deserialize)]
struct DistrictRecord {
    name: String,
    #[serde(default)]
    name_en: String,
    latitude: f64,
    longitude: f64,
}

/// One gazetteer row: a district with its enclosing city
#[derive(Debug, Clone)]
pub struct GazetteerEntry {
    pub city: String,
    pub district: String,
    pub city_en: String,
    pub district_en: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Default)]
pub struct Gazetteer {
    entries: Vec<GazetteerEntry>,
    /// `city|district` (normalized zh) -> entry index
    by_city_district: HashMap<String, usize>,
    /// normalized zh district -> entry indexes in resource order
    by_district: HashMap<String, Vec<usize>>,
    /// `city|district` (normalized en) -> entry index
    by_city_district_en: HashMap<String, usize>,
    /// normalized en district -> entry indexes in resource order
    by_district_en: HashMap<String, Vec<usize>>,
    /// normalized city names in resource order, for substring detection
    cities_zh: Vec<String>,
    cities_en: Vec<String>,
}

/// Normalize a user-provided string for zh matching: trim, fold the variant
/// character 臺 to 台, turn commas into spaces and collapse whitespace.
pub fn normalize_zh(input: &str) -> String {
    let s: String = input
        .trim()
        .chars()
        .map(|c| match c {
            '臺' => '台',
            '，' | ',' => ' ',
            other => other,
        })
        .collect();
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a user-provided string for en matching: trim, lowercase, turn
/// commas into spaces, collapse whitespace and drop whole-word
/// city/county/district/township tokens.
pub fn normalize_en(input: &str) -> String {
    let lowered = input.trim().to_lowercase().replace([',', '，'], " ");
    lowered
        .split_whitespace()
        .filter(|token| !matches!(*token, "city" | "county" | "district" | "township"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Remove a common trailing administrative suffix for district matching.
/// City names are never stripped this way; 縣/市 endings stay intact when a
/// string is used as a city candidate.
pub fn strip_district_suffix(name: &str) -> &str {
    name.trim()
        .strip_suffix(['區', '鄉', '鎮', '市'])
        .unwrap_or(name.trim())
}

/// Whether the string contains CJK ideographs; selects the zh lookup path
/// regardless of the declared language.
pub fn contains_cjk(input: &str) -> bool {
    input.chars().any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c))
}

fn make_key(city: &str, district: &str) -> String {
    format!("{city}|{district}")
}

impl Gazetteer {
    /// Parse the gazetteer resource and build the lookup indexes
    pub fn from_json_str(raw: &str) -> Result<Self, AppError> {
        let records: Vec<CityRecord> = serde_json::from_str(raw)
            .map_err(|e| AppError::GazetteerResource(format!("invalid gazetteer JSON: {e}")))?;

        let mut gazetteer = Gazetteer::default();

        for city_record in &records {
            let city = normalize_zh(&city_record.city);
            if city.is_empty() {
                continue;
            }

            let city_en = normalize_en(&city_record.city_en);
            if !gazetteer.cities_zh.contains(&city) {
                gazetteer.cities_zh.push(city.clone());
            }
            if !city_en.is_empty() && !gazetteer.cities_en.contains(&city_en) {
                gazetteer.cities_en.push(city_en.clone());
            }

            for district_record in &city_record.districts {
                let district = normalize_zh(&district_record.name);
                if district.is_empty() {
                    continue;
                }
                if !district_record.latitude.is_finite() || !district_record.longitude.is_finite() {
                    continue;
                }

                let index = gazetteer.entries.len();
                gazetteer.entries.push(GazetteerEntry {
                    city: city.clone(),
                    district: district.clone(),
                    city_en: city_record.city_en.clone(),
                    district_en: district_record.name_en.clone(),
                    latitude: district_record.latitude,
                    longitude: district_record.longitude,
                });

                gazetteer
                    .by_city_district
                    .entry(make_key(&city, &district))
                    .or_insert(index);
                gazetteer
                    .by_district
                    .entry(district)
                    .or_default()
                    .push(index);

                let district_en = normalize_en(&district_record.name_en);
                if !city_en.is_empty() && !district_en.is_empty() {
                    gazetteer
                        .by_city_district_en
                        .entry(make_key(&city_en, &district_en))
                        .or_insert(index);
                    gazetteer
                        .by_district_en
                        .entry(district_en)
                        .or_default()
                        .push(index);
                }
            }
        }

        debug!(
            "Gazetteer ready: {} entries, {} cities",
            gazetteer.entries.len(),
            gazetteer.cities_zh.len()
        );
        Ok(gazetteer)
    }

    /// Load from a resource file, or the bundled resource when no path is
    /// given
    pub async fn load(path: Option<&Path>) -> Result<Self, AppError> {
        match path {
            Some(path) => {
                let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
                    AppError::GazetteerResource(format!(
                        "failed to read {}: {e}",
                        path.display()
                    ))
                })?;
                Self::from_json_str(&raw)
            }
            None => Self::from_json_str(BUNDLED_GAZETTEER),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Try to resolve a raw place name against the local table.
    /// Returns `None` on a miss; never errors.
    #[instrument(skip(self))]
    pub fn lookup(&self, raw_input: &str) -> Option<GeoResult> {
        if raw_input.trim().is_empty() {
            return None;
        }

        if contains_cjk(raw_input) {
            self.lookup_zh(raw_input)
        } else {
            self.lookup_en(raw_input)
        }
    }

    fn lookup_zh(&self, raw_input: &str) -> Option<GeoResult> {
        let raw = normalize_zh(raw_input);
        if raw.is_empty() {
            return None;
        }

        let tokens: Vec<&str> = raw.split(' ').filter(|t| !t.is_empty()).collect();

        // Detect a known city as a substring of the normalized query.
        // City names are matched intact; no suffix stripping here.
        let found_city = self
            .cities_zh
            .iter()
            .find(|city| raw.contains(city.as_str()))
            .cloned();

        // District candidates: remainder after removing the city, then the
        // last token, each with and without the administrative suffix.
        let mut district_candidates: Vec<String> = Vec::new();
        if let Some(city) = &found_city {
            let rest = raw.replacen(city.as_str(), "", 1);
            let rest = rest.trim();
            // A city listed without its 市 marker leaves the marker at the
            // head of the remainder; it belongs to the city, not the district
            let rest = rest.strip_prefix('市').unwrap_or(rest).trim();
            if !rest.is_empty() {
                district_candidates.push(rest.to_string());
            }
        }
        if let Some(last) = tokens.last() {
            district_candidates.push((*last).to_string());
        }

        let district_candidates: Vec<String> = district_candidates
            .iter()
            .flat_map(|candidate| {
                let stripped = strip_district_suffix(candidate);
                if !stripped.is_empty() && stripped != candidate.as_str() {
                    vec![candidate.clone(), stripped.to_string()]
                } else {
                    vec![candidate.clone()]
                }
            })
            .collect();

        // 1) Exact (city, district) match
        if let Some(city) = &found_city {
            for district in &district_candidates {
                if let Some(&index) = self.by_city_district.get(&make_key(city, district)) {
                    let hit = &self.entries[index];
                    return Some(self.zh_result(hit, format!("{}{}", hit.city, hit.district)));
                }
            }
        }

        // 2) District-only match; ambiguous names resolve to the first
        //    entry in resource order
        for district in &district_candidates {
            if let Some(indexes) = self.by_district.get(district)
                && let Some(&index) = indexes.first()
            {
                let hit = &self.entries[index];
                return Some(self.zh_result(hit, hit.district.clone()));
            }
        }

        None
    }

    fn lookup_en(&self, raw_input: &str) -> Option<GeoResult> {
        let raw = normalize_en(raw_input);
        if raw.is_empty() {
            return None;
        }

        let tokens: Vec<&str> = raw.split(' ').filter(|t| !t.is_empty()).collect();

        let found_city = self
            .cities_en
            .iter()
            .find(|city| raw.contains(city.as_str()))
            .cloned();

        let mut district_candidates: Vec<String> = Vec::new();
        if let Some(first) = tokens.first() {
            district_candidates.push((*first).to_string());
        }
        if let Some(last) = tokens.last() {
            district_candidates.push((*last).to_string());
        }

        // 1) Exact (city, district) match
        if let Some(city) = &found_city {
            for district in &district_candidates {
                if let Some(&index) = self.by_city_district_en.get(&make_key(city, district)) {
                    let hit = &self.entries[index];
                    return Some(self.en_result(
                        hit,
                        format!("{} {}", self.en_city_name(hit), self.en_district_name(hit)),
                    ));
                }
            }
        }

        // 2) District-only match, first in resource order
        for district in &district_candidates {
            if let Some(indexes) = self.by_district_en.get(district)
                && let Some(&index) = indexes.first()
            {
                let hit = &self.entries[index];
                return Some(self.en_result(hit, self.en_district_name(hit).to_string()));
            }
        }

        None
    }

    fn en_city_name<'a>(&self, hit: &'a GazetteerEntry) -> &'a str {
        if hit.city_en.is_empty() { &hit.city } else { &hit.city_en }
    }

    fn en_district_name<'a>(&self, hit: &'a GazetteerEntry) -> &'a str {
        if hit.district_en.is_empty() {
            &hit.district
        } else {
            &hit.district_en
        }
    }

    fn zh_result(&self, hit: &GazetteerEntry, matched_query: String) -> GeoResult {
        GeoResult {
            latitude: hit.latitude,
            longitude: hit.longitude,
            resolved_name: hit.district.clone(),
            admin_area: hit.city.clone(),
            timezone: TZ_NAME.to_string(),
            country_code: "TW".to_string(),
            matched_query,
        }
    }

    fn en_result(&self, hit: &GazetteerEntry, matched_query: String) -> GeoResult {
        GeoResult {
            latitude: hit.latitude,
            longitude: hit.longitude,
            resolved_name: self.en_district_name(hit).to_string(),
            admin_area: self.en_city_name(hit).to_string(),
            timezone: TZ_NAME.to_string(),
            country_code: "TW".to_string(),
            matched_query,
        }
    }
}
