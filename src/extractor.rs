//! Stage 2: Structure Extractor — numerics, temporals, subject, polarity.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{ClaimStructure, NumericValue, Polarity, TemporalValue, Unit};

const NEGATION_WORDS: &[&str] = &[
    "not", "no", "never", "n't", "none", "neither", "without", "lack", "fail", "failed", "unable",
    "deny", "denied", "refuse", "refused",
];

const HEDGE_WORDS: &[&str] = &["might", "may", "could", "possibly", "perhaps", "likely"];

static CURRENCY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<symbol>[$€£])\s*(?P<num>\d+(?:\.\d+)?)\s*(?P<mag>[KkMmBb](?:illion)?)?")
        .expect("static pattern is valid")
});

static PERCENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?P<num>\d+(?:\.\d+)?)\s*%").expect("static pattern is valid"));

static MAGNITUDE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?P<num>\d+(?:\.\d+)?)\s*(?P<mag>million|billion|thousand)")
        .expect("static pattern is valid")
});

static QUARTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Q(?P<q>[1-4])\s*(?P<year>\d{4})").expect("static pattern is valid"));

static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?P<year>20\d{2})\b").expect("static pattern is valid"));

static MONTH_YEAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?P<month>january|february|march|april|may|june|july|august|september|october|november|december)\s+(?P<year>\d{4})")
        .expect("static pattern is valid")
});

fn currency_multiplier(mag: Option<&str>) -> f64 {
    match mag.map(|m| m.to_ascii_lowercase()) {
        None => 1.0,
        Some(m) if m.starts_with('k') => 1e3,
        Some(m) if m.starts_with('m') => 1e6,
        Some(m) if m.starts_with('b') => 1e9,
        _ => 1.0,
    }
}

fn word_multiplier(mag: &str) -> f64 {
    match mag.to_ascii_lowercase().as_str() {
        "thousand" => 1e3,
        "million" => 1e6,
        "billion" => 1e9,
        _ => 1.0,
    }
}

fn quarter_range(quarter: u32, year: i32) -> Option<(NaiveDate, NaiveDate)> {
    let (start_month, end_month, end_day) = match quarter {
        1 => (1, 3, 31),
        2 => (4, 6, 30),
        3 => (7, 9, 30),
        4 => (10, 12, 31),
        _ => return None,
    };
    let start = NaiveDate::from_ymd_opt(year, start_month, 1)?;
    let end = NaiveDate::from_ymd_opt(year, end_month, end_day)?;
    Some((start, end))
}

fn month_index(name: &str) -> Option<u32> {
    const MONTHS: &[&str] = &[
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
    ];
    MONTHS
        .iter()
        .position(|m| *m == name.to_ascii_lowercase())
        .map(|idx| idx as u32 + 1)
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1).map(|d| d - chrono::Duration::days(1))
}

/// Pluggable dependency-parse model for subject and negation tagging.
///
/// The shipped stub contributes nothing beyond the regex-based negation
/// counting, so extraction never blocks on an unavailable model.
pub trait NlpModel: Send + Sync {
    /// First nominal subject of the first sentence, if the model can
    /// determine one.
    fn subject(&self, text: &str) -> Option<String>;
    /// Additional dependency-tagged negation tokens beyond the static
    /// negation word list.
    fn extra_negations(&self, text: &str) -> Vec<String>;
}

/// No-op model used when no real dependency parser is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubNlpModel;

impl NlpModel for StubNlpModel {
    fn subject(&self, _text: &str) -> Option<String> {
        None
    }

    fn extra_negations(&self, _text: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Produces a [`ClaimStructure`] from raw text.
pub struct StructureExtractor<M: NlpModel = StubNlpModel> {
    nlp: M,
}

impl Default for StructureExtractor<StubNlpModel> {
    fn default() -> Self {
        Self { nlp: StubNlpModel }
    }
}

impl<M: NlpModel> StructureExtractor<M> {
    pub fn with_model(nlp: M) -> Self {
        Self { nlp }
    }

    pub fn extract(&self, text: &str) -> ClaimStructure {
        let numeric_values = extract_numerics(text);
        let temporal_values = extract_temporals(text);
        let negation_words = find_negations(text, &self.nlp);
        let polarity = derive_polarity(text, &negation_words);
        let subject = self.nlp.subject(text);
        let extraction_confidence =
            confidence(text, &numeric_values, &temporal_values, subject.is_some());

        ClaimStructure {
            text: text.to_string(),
            numeric_values,
            temporal_values,
            subject,
            polarity,
            negation_words,
            extraction_confidence,
        }
    }
}

fn extract_numerics(text: &str) -> Vec<NumericValue> {
    let mut results = Vec::new();

    for caps in CURRENCY_RE.captures_iter(text) {
        let symbol = &caps["symbol"];
        let num: f64 = caps["num"].parse().unwrap_or(0.0);
        let multiplier = currency_multiplier(caps.name("mag").map(|m| m.as_str()));
        let unit = match symbol {
            "$" => Unit::Usd,
            "€" => Unit::Eur,
            "£" => Unit::Gbp,
            _ => Unit::Usd,
        };
        results.push(NumericValue {
            raw: caps[0].to_string(),
            value: num * multiplier,
            unit,
            confidence: 0.95,
        });
    }

    for caps in PERCENT_RE.captures_iter(text) {
        let num: f64 = caps["num"].parse().unwrap_or(0.0);
        results.push(NumericValue {
            raw: caps[0].to_string(),
            value: num / 100.0,
            unit: Unit::Percent,
            confidence: 0.98,
        });
    }

    for caps in MAGNITUDE_RE.captures_iter(text) {
        let num: f64 = caps["num"].parse().unwrap_or(0.0);
        let multiplier = word_multiplier(&caps["mag"]);
        results.push(NumericValue {
            raw: caps[0].to_string(),
            value: num * multiplier,
            unit: Unit::None,
            confidence: 0.90,
        });
    }

    results
}

fn extract_temporals(text: &str) -> Vec<TemporalValue> {
    let mut results = Vec::new();
    let mut quarter_spans: Vec<(usize, usize)> = Vec::new();

    for caps in QUARTER_RE.captures_iter(text) {
        let quarter: u32 = caps["q"].parse().unwrap_or(1);
        let year: i32 = caps["year"].parse().unwrap_or(1970);
        if let Some((start, end)) = quarter_range(quarter, year) {
            let whole = caps.get(0).unwrap();
            quarter_spans.push((whole.start(), whole.end()));
            results.push(TemporalValue {
                raw: whole.as_str().to_string(),
                start,
                end,
                confidence: 0.95,
            });
        }
    }

    for caps in YEAR_RE.captures_iter(text) {
        let whole = caps.get(0).unwrap();
        let overlaps_quarter = quarter_spans
            .iter()
            .any(|&(s, e)| whole.start() >= s && whole.end() <= e);
        if overlaps_quarter {
            continue;
        }
        let year: i32 = caps["year"].parse().unwrap_or(1970);
        if let (Some(start), Some(end)) = (
            NaiveDate::from_ymd_opt(year, 1, 1),
            NaiveDate::from_ymd_opt(year, 12, 31),
        ) {
            results.push(TemporalValue {
                raw: whole.as_str().to_string(),
                start,
                end,
                confidence: 0.85,
            });
        }
    }

    for caps in MONTH_YEAR_RE.captures_iter(text) {
        let month = match month_index(&caps["month"]) {
            Some(m) => m,
            None => continue,
        };
        let year: i32 = caps["year"].parse().unwrap_or(1970);
        if let (Some(start), Some(end)) =
            (NaiveDate::from_ymd_opt(year, month, 1), last_day_of_month(year, month))
        {
            results.push(TemporalValue {
                raw: caps[0].to_string(),
                start,
                end,
                confidence: 0.90,
            });
        }
    }

    results
}

fn find_negations<M: NlpModel>(text: &str, nlp: &M) -> Vec<String> {
    let mut negations = Vec::new();
    for word in text.split_whitespace() {
        let bare = word.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'');
        let lower = bare.to_lowercase();
        if NEGATION_WORDS.contains(&lower.as_str()) || lower.ends_with("n't") {
            negations.push(bare.to_string());
        }
    }
    negations.extend(nlp.extra_negations(text));
    negations
}

fn derive_polarity(text: &str, negations: &[String]) -> Polarity {
    if negations.len() % 2 == 1 {
        return Polarity::Negative;
    }
    if !negations.is_empty() {
        return Polarity::Positive;
    }

    let lower = text.to_lowercase();
    let has_hedge = lower
        .split_whitespace()
        .any(|w| HEDGE_WORDS.contains(&w.trim_matches(|c: char| !c.is_alphanumeric())));
    if has_hedge {
        return Polarity::Uncertain;
    }

    Polarity::Positive
}

fn confidence(
    text: &str,
    numerics: &[NumericValue],
    temporals: &[TemporalValue],
    has_subject: bool,
) -> f64 {
    let mut conf: f64 = 0.70;
    if CURRENCY_RE.is_match(text) {
        conf += 0.10;
    }
    if QUARTER_RE.is_match(text) {
        conf += 0.10;
    }
    if has_subject {
        conf += 0.05;
    }
    let _ = numerics;
    let _ = temporals;
    conf.min(0.95)
}
