//! Location-resolution data model

use serde::{Deserialize, Serialize};

use crate::i18n::Lang;

/// A resolved place: coordinates plus display metadata.
/// Produced by either the gazetteer or the remote geocoding resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoResult {
    pub latitude: f64,
    pub longitude: f64,
    /// Display name of the matched place (district for gazetteer hits)
    pub resolved_name: String,
    /// Enclosing administrative area (city for gazetteer hits)
    pub admin_area: String,
    pub timezone: String,
    pub country_code: String,
    /// The query string that actually matched — may be a rewritten
    /// candidate rather than the raw input
    pub matched_query: String,
}

impl GeoResult {
    /// A result with non-finite coordinates is treated as "not found":
    /// never cached, never rendered.
    pub fn has_finite_coordinates(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A location query as received from the embedding caller. Not persisted;
/// derived each resolution cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationQuery {
    pub language: Lang,
    pub raw_text: String,
}

impl LocationQuery {
    /// Build a query from caller input. The raw text is trimmed and
    /// whitespace-collapsed before any lookup; empty input falls back to
    /// the language-specific default location.
    pub fn new(language: Lang, raw_text: &str) -> Self {
        let cleaned = collapse_whitespace(raw_text);
        let raw_text = if cleaned.is_empty() {
            language.default_location().to_string()
        } else {
            cleaned
        };
        Self { language, raw_text }
    }

    /// Query for the language's default location
    pub fn default_for(language: Lang) -> Self {
        Self::new(language, "")
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
