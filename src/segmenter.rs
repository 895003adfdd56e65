//! Stage 1: Segmenter — split input text into atomic claim candidates.

use once_cell::sync::Lazy;
use regex::Regex;

/// Tokens that mark a sentence as an instruction rather than a claim.
const IMPERATIVE_STARTERS: &[&str] = &[
    "write",
    "summarize",
    "list",
    "explain",
    "show",
    "tell",
    "give",
    "create",
    "generate",
    "draft",
];

// The `regex` crate has no lookbehind, so the terminator char is captured
// explicitly and kept on the preceding segment by hand instead of relying
// on `Regex::split`, which would consume it along with the separator.
static SPLIT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([.!?])\s+|\n+").expect("static pattern is valid"));

/// Splits `text` on sentence terminators and line breaks, keeping each
/// `.`/`!`/`?` attached to the segment it ends.
fn split_segments(text: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut last_end = 0;

    for caps in SPLIT_PATTERN.captures_iter(text) {
        let whole = caps.get(0).unwrap();
        let segment_end = match caps.get(1) {
            Some(terminator) => terminator.end(),
            None => whole.start(),
        };
        segments.push(&text[last_end..segment_end]);
        last_end = whole.end();
    }
    segments.push(&text[last_end..]);

    segments
}

/// Splits text into claim candidates and discards non-claims.
///
/// Exposed as a trait so that a future LM-based segmenter can be swapped
/// in without touching any other pipeline stage.
pub trait Segmenter: Send + Sync {
    fn segment(&self, text: &str) -> Vec<String>;
}

/// Deterministic, regex-based segmenter. Never fails: empty or
/// whitespace-only input produces an empty output.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleBasedSegmenter;

impl Segmenter for RuleBasedSegmenter {
    fn segment(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        split_segments(text)
            .into_iter()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .filter(|part| is_claim_candidate(part))
            .map(str::to_string)
            .collect()
    }
}

fn is_claim_candidate(sentence: &str) -> bool {
    if sentence.chars().count() < 12 {
        return false;
    }
    if sentence.ends_with('?') {
        return false;
    }

    let tokens: Vec<&str> = sentence.split_whitespace().collect();
    if tokens.len() < 3 {
        return false;
    }

    let first = tokens[0]
        .to_lowercase()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_string();
    if IMPERATIVE_STARTERS.contains(&first.as_str()) {
        return false;
    }

    let len = sentence.chars().count().max(1) as f64;
    let alnum = sentence.chars().filter(|c| c.is_alphanumeric()).count() as f64;
    if alnum / len < 0.5 {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(text: &str) -> Vec<String> {
        RuleBasedSegmenter.segment(text)
    }

    #[test]
    fn empty_input_yields_no_claims() {
        assert!(segment("").is_empty());
        assert!(segment("   \n\n  ").is_empty());
    }

    #[test]
    fn splits_on_terminators_and_line_breaks() {
        let claims = segment("Revenue was $5M in Q3 2024. The company is profitable.\nSales grew this year.");
        assert_eq!(claims.len(), 3);
        assert_eq!(claims[0], "Revenue was $5M in Q3 2024.");
        assert_eq!(claims[1], "The company is profitable.");
        assert_eq!(claims[2], "Sales grew this year.");
    }

    #[test]
    fn discards_questions() {
        let claims = segment("Did revenue grow this quarter?");
        assert!(claims.is_empty());
    }

    #[test]
    fn discards_imperative_commands() {
        let claims = segment("Summarize the quarterly earnings report for investors.");
        assert!(claims.is_empty());
    }

    #[test]
    fn discards_short_fragments() {
        let claims = segment("Yes. No way.");
        assert!(claims.is_empty());
    }

    #[test]
    fn discards_low_alphanumeric_ratio() {
        let claims = segment("!!! --- ... *** /// ### @@@ %%%");
        assert!(claims.is_empty());
    }

    #[test]
    fn quoted_imperative_starter_is_still_discarded() {
        let claims = segment("\"Explain\" the reasoning behind this decision please.");
        assert!(claims.is_empty());
    }
}
