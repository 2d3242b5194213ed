//! Language state and message table.
//!
//! The upstream almanac and geocoding payloads are language-independent; the
//! language only selects default location strings and rendered text. Message
//! lookup is a typed enumeration mapped to per-language templates with
//! `{placeholder}` substitution.

use serde::{Deserialize, Serialize};

use crate::constants::default_location;

/// Supported dashboard languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Zh,
    En,
}

impl Lang {
    /// Two-letter code as used in cache keys and API query parameters
    pub fn code(self) -> &'static str {
        match self {
            Lang::Zh => "zh",
            Lang::En => "en",
        }
    }

    /// Parse a two-letter code. Anything other than `en` falls back to `zh`,
    /// matching the original dashboard's language handling.
    pub fn from_code(code: &str) -> Lang {
        match code.trim() {
            "en" => Lang::En,
            _ => Lang::Zh,
        }
    }

    /// Language-specific default location string
    pub fn default_location(self) -> &'static str {
        match self {
            Lang::Zh => default_location::ZH,
            Lang::En => default_location::EN,
        }
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Typed message keys. Each maps to a per-language template; placeholders
/// use the `{name}` form and are substituted by [`t`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKey {
    LocationFooter,
    LocationWeatherHint,
    LocationWeatherHintFail,
    WeatherLoading,
    WeatherNa,
    WeatherFeels,
    LabelUpdated,
    LunarYi,
    LunarJi,
    LunarDatePrefix,
    SolarTermPrefix,
}

impl MessageKey {
    /// Template string for the given language
    pub fn template(self, lang: Lang) -> &'static str {
        use MessageKey::*;
        match (self, lang) {
            (LocationFooter, Lang::Zh) => "地點：{loc}",
            (LocationFooter, Lang::En) => "Location: {loc}",
            (LocationWeatherHint, Lang::Zh) => "地點：{loc}",
            (LocationWeatherHint, Lang::En) => "Location: {loc}",
            (LocationWeatherHintFail, Lang::Zh) => "地點：{loc}（地名解析失敗，請換個寫法）",
            (LocationWeatherHintFail, Lang::En) => "Location: {loc} (could not resolve, try another spelling)",
            (WeatherLoading, Lang::Zh) => "更新中…",
            (WeatherLoading, Lang::En) => "Updating…",
            (WeatherNa, Lang::Zh) => "無資料",
            (WeatherNa, Lang::En) => "N/A",
            (WeatherFeels, Lang::Zh) => "體感 {v}°C",
            (WeatherFeels, Lang::En) => "Feels like {v}°C",
            (LabelUpdated, Lang::Zh) => "更新：",
            (LabelUpdated, Lang::En) => "Updated: ",
            (LunarYi, Lang::Zh) => "宜",
            (LunarYi, Lang::En) => "Auspicious",
            (LunarJi, Lang::Zh) => "忌",
            (LunarJi, Lang::En) => "Inauspicious",
            (LunarDatePrefix, Lang::Zh) => "農曆：",
            (LunarDatePrefix, Lang::En) => "Lunar: ",
            (SolarTermPrefix, Lang::Zh) => "節氣：",
            (SolarTermPrefix, Lang::En) => "Solar term: ",
        }
    }
}

/// Render a message template, substituting `{name}` placeholders from `vars`.
/// Unknown placeholders are left verbatim.
pub fn t(lang: Lang, key: MessageKey, vars: &[(&str, &str)]) -> String {
    let mut out = key.template(lang).to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}

/// Human-readable description for a WMO weather code.
/// Unknown codes map to a generic description.
pub fn weather_description(lang: Lang, code: Option<u16>) -> &'static str {
    let Some(c) = code else {
        return match lang {
            Lang::Zh => "天氣狀態",
            Lang::En => "Weather",
        };
    };

    match lang {
        Lang::Zh => match c {
            0 => "晴朗",
            1 => "大致晴朗",
            2 => "局部多雲",
            3 => "陰天",
            45 => "有霧",
            48 => "霧（霧淞）",
            51 => "毛毛雨（小）",
            53 => "毛毛雨（中）",
            55 => "毛毛雨（大）",
            56 => "凍毛毛雨（小）",
            57 => "凍毛毛雨（大）",
            61 => "下雨（小）",
            63 => "下雨（中）",
            65 => "下雨（大）",
            66 => "凍雨（小）",
            67 => "凍雨（大）",
            71 => "下雪（小）",
            73 => "下雪（中）",
            75 => "下雪（大）",
            77 => "雪粒",
            80 => "陣雨（小）",
            81 => "陣雨（中）",
            82 => "陣雨（大）",
            85 => "陣雪（小）",
            86 => "陣雪（大）",
            95 => "雷雨",
            96 => "雷雨（冰雹）",
            99 => "強雷雨（冰雹）",
            _ => "天氣狀態",
        },
        Lang::En => match c {
            0 => "Clear sky",
            1 => "Mainly clear",
            2 => "Partly cloudy",
            3 => "Overcast",
            45 => "Fog",
            48 => "Depositing rime fog",
            51 => "Light drizzle",
            53 => "Moderate drizzle",
            55 => "Dense drizzle",
            56 => "Light freezing drizzle",
            57 => "Dense freezing drizzle",
            61 => "Slight rain",
            63 => "Moderate rain",
            65 => "Heavy rain",
            66 => "Light freezing rain",
            67 => "Heavy freezing rain",
            71 => "Slight snowfall",
            73 => "Moderate snowfall",
            75 => "Heavy snowfall",
            77 => "Snow grains",
            80 => "Slight rain showers",
            81 => "Moderate rain showers",
            82 => "Violent rain showers",
            85 => "Slight snow showers",
            86 => "Heavy snow showers",
            95 => "Thunderstorm",
            96 => "Thunderstorm with slight hail",
            99 => "Thunderstorm with heavy hail",
            _ => "Weather",
        },
    }
}
