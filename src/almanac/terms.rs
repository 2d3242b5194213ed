//! Yi/Ji term dictionary and solar-term translation.
//!
//! Almanac term lists arrive as pipe-delimited strings whose tokens may be
//! simplified script, traditional script or an alias. The index maps every
//! normalized token to a canonical record; a miss yields the normalized
//! token itself and lands in an unknown-terms diagnostic set.

use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::{LazyLock, Mutex};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::i18n::Lang;

/// Bundled term dictionary resource
const BUNDLED_TERM_DICT: &str = include_str!("../../data/yiji.json");

/// Simplified -> traditional folding for common Yi/Ji tokens
static S2T_TERM: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("开市", "開市"),
        ("纳财", "納財"),
        ("纳采", "納采"),
        ("纳畜", "納畜"),
        ("动土", "動土"),
        ("修造", "修造"),
        ("上梁", "上樑"),
        ("入宅", "入宅"),
        ("祈福", "祈福"),
        ("掘井", "掘井"),
        ("安门", "安門"),
        ("安葬", "安葬"),
        ("作灶", "作灶"),
        ("补垣", "補垣"),
        ("开池", "開池"),
        ("取渔", "取漁"),
        ("嫁娶", "嫁娶"),
        ("安床", "安床"),
        ("立券", "立券"),
        ("伐木", "伐木"),
        ("栽种", "栽種"),
        ("经络", "經絡"),
        ("开光", "開光"),
        ("出行", "出行"),
        ("修坟", "修墳"),
        ("造桥", "造橋"),
        ("造庙", "造廟"),
        ("祭祀", "祭祀"),
        ("祠堂", "祠堂"),
        ("安香", "安香"),
        ("谢土", "謝土"),
        ("解除", "解除"),
        ("交易", "交易"),
        ("无", "無"),
    ])
});

/// Simplified -> traditional folding for solar-term names that differ
static JIEQI_S2T: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("谷雨", "穀雨"),
        ("惊蛰", "驚蟄"),
        ("处暑", "處暑"),
    ])
});

/// English names of the 24 solar terms
static JIEQI_EN: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("立春", "Start of Spring"),
        ("雨水", "Rain Water"),
        ("驚蟄", "Awakening of Insects"),
        ("春分", "Spring Equinox"),
        ("清明", "Clear and Bright"),
        ("穀雨", "Grain Rain"),
        ("立夏", "Start of Summer"),
        ("小滿", "Grain Full"),
        ("芒種", "Grain in Ear"),
        ("夏至", "Summer Solstice"),
        ("小暑", "Minor Heat"),
        ("大暑", "Major Heat"),
        ("立秋", "Start of Autumn"),
        ("處暑", "End of Heat"),
        ("白露", "White Dew"),
        ("秋分", "Autumn Equinox"),
        ("寒露", "Cold Dew"),
        ("霜降", "Frost's Descent"),
        ("立冬", "Start of Winter"),
        ("小雪", "Minor Snow"),
        ("大雪", "Major Snow"),
        ("冬至", "Winter Solstice"),
        ("小寒", "Minor Cold"),
        ("大寒", "Major Cold"),
    ])
});

/// Canonical term record from the dictionary resource
#[derive(Debug, Clone, Deserialize)]
pub struct TermRecord {
    pub key: String,
    #[serde(default, rename = "zhHant")]
    pub zh_hant: Option<String>,
    #[serde(default)]
    pub en: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TermDict {
    #[serde(default)]
    items: Vec<TermRecord>,
}

/// In-memory term index, built once per session. Never persisted.
#[derive(Debug, Default)]
pub struct YiJiTermIndex {
    records: Vec<TermRecord>,
    /// normalized token (key or alias) -> record index
    index: HashMap<String, usize>,
    /// Normalized tokens that missed the index; process-lifetime,
    /// unbounded, for observability only
    unknown: Mutex<BTreeSet<String>>,
}

/// Normalize a Yi/Ji token: punctuation to spaces, collapse, keep the
/// first word, fold simplified script to traditional.
pub fn normalize_term_token(raw: &str) -> String {
    let spaced: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            '、' | '，' | ',' | '；' | ';' | '。' | '.' => ' ',
            other => other,
        })
        .collect();

    let first = spaced.split_whitespace().next().unwrap_or("");
    match S2T_TERM.get(first) {
        Some(folded) => (*folded).to_string(),
        None => first.to_string(),
    }
}

impl YiJiTermIndex {
    /// Parse the dictionary resource and build the token index
    pub fn from_json_str(raw: &str) -> Result<Self, AppError> {
        let dict: TermDict = serde_json::from_str(raw)
            .map_err(|e| AppError::TermDictResource(format!("invalid term dictionary: {e}")))?;

        let mut terms = YiJiTermIndex::default();
        for record in dict.items {
            let index = terms.records.len();

            let key = normalize_term_token(&record.key);
            if !key.is_empty() {
                terms.index.insert(key, index);
            }
            for alias in &record.aliases {
                let alias_key = normalize_term_token(alias);
                if !alias_key.is_empty() {
                    terms.index.insert(alias_key, index);
                }
            }

            terms.records.push(record);
        }

        debug!("YiJi term index ready, size = {}", terms.index.len());
        Ok(terms)
    }

    /// Build from the bundled dictionary resource
    pub fn load_bundled() -> Result<Self, AppError> {
        Self::from_json_str(BUNDLED_TERM_DICT)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Translate a single term token. Unknown tokens pass through as their
    /// normalized form and are recorded in the diagnostic set.
    pub fn translate(&self, lang: Lang, term: &str) -> String {
        let key = normalize_term_token(term);
        if key.is_empty() {
            return String::new();
        }

        let Some(&index) = self.index.get(&key) else {
            warn!("Unknown YiJi term: {key} (from: {})", term.trim());
            self.unknown.lock().unwrap().insert(key.clone());
            return key;
        };

        let record = &self.records[index];
        let fallback = || {
            record
                .zh_hant
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| {
                    if record.key.is_empty() {
                        key.clone()
                    } else {
                        record.key.clone()
                    }
                })
        };

        match lang {
            Lang::En => record
                .en
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(fallback),
            Lang::Zh => fallback(),
        }
    }

    /// Snapshot of the unknown-terms diagnostic set
    pub fn unknown_terms(&self) -> Vec<String> {
        self.unknown.lock().unwrap().iter().cloned().collect()
    }
}

/// Translate a solar-term name, folding simplified variants first.
/// Chinese output keeps the traditional form; unknown terms pass through.
pub fn translate_jieqi(lang: Lang, term: &str) -> String {
    let trimmed = term.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let folded = JIEQI_S2T.get(trimmed).copied().unwrap_or(trimmed);
    match lang {
        Lang::Zh => folded.to_string(),
        Lang::En => JIEQI_EN.get(folded).copied().unwrap_or(folded).to_string(),
    }
}
