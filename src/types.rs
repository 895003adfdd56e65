//! Data model shared across the verification pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Unit a [`NumericValue`] is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    Usd,
    Eur,
    Gbp,
    Percent,
    None,
}

/// A numeric value extracted from text, normalized to its base unit.
///
/// `value` is always expressed in the base unit: currency magnitudes
/// (K/M/B) are expanded, and percentages are stored as a fraction in
/// `[0, 1]` rather than as `0..100`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericValue {
    pub raw: String,
    pub value: f64,
    pub unit: Unit,
    pub confidence: f64,
}

/// A temporal value extracted from text, normalized to an inclusive UTC
/// date range. `start <= end` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalValue {
    pub raw: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub confidence: f64,
}

/// Polarity of an assertion, derived from negation counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    Positive,
    Negative,
    Uncertain,
}

/// Structured representation of a piece of text (a claim or an evidence
/// passage), produced by the structure extractor (C2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimStructure {
    pub text: String,
    pub numeric_values: Vec<NumericValue>,
    pub temporal_values: Vec<TemporalValue>,
    pub subject: Option<String>,
    pub polarity: Polarity,
    pub negation_words: Vec<String>,
    pub extraction_confidence: f64,
}

/// Outcome of comparing a claim's structure against an evidence
/// structure (C3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonResult {
    Match,
    Contradiction,
    Partial,
    NoComparison,
}

/// Fine-grained reason for a [`ComparisonResult::Contradiction`] or
/// [`ComparisonResult::Partial`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContradictionType {
    Magnitude,
    Temporal,
    Negation,
}

/// Result of structurally comparing a claim against a single evidence
/// structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comparison {
    pub result: ComparisonResult,
    pub contradiction_type: Option<ContradictionType>,
    pub confidence: f64,
    pub explanation: String,
}

/// A single retrieved passage from the library, annotated with its
/// relevance score and provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidencePassage {
    pub text: String,
    pub source: String,
    pub page: Option<u32>,
    /// Cosine similarity after retrieval, or the cross-encoder score if
    /// this passage was reranked.
    pub similarity: f64,
    pub document_id: Option<String>,
}

/// Final outcome for a single claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Supported,
    Contradicted,
    Partial,
    NoEvidence,
}

/// Per-claim verdict with evidence attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimVerdict {
    pub claim_text: String,
    pub verdict: Verdict,
    pub confidence: f64,
    pub evidence_text: String,
    pub evidence_source: String,
    pub evidence_page: Option<u32>,
    pub reason: String,
    pub used_llm: bool,
    pub contradiction_type: Option<ContradictionType>,
}

/// Verdict counts by outcome, consistent with the verdict list they were
/// derived from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct VerdictCounts {
    pub total: usize,
    pub supported: usize,
    pub partial: usize,
    pub contradicted: usize,
    pub no_evidence: usize,
}

impl VerdictCounts {
    pub fn tally(verdicts: &[ClaimVerdict]) -> Self {
        let mut counts = Self {
            total: verdicts.len(),
            ..Default::default()
        };
        for v in verdicts {
            match v.verdict {
                Verdict::Supported => counts.supported += 1,
                Verdict::Partial => counts.partial += 1,
                Verdict::Contradicted => counts.contradicted += 1,
                Verdict::NoEvidence => counts.no_evidence += 1,
            }
        }
        counts
    }
}

/// Result of verifying every claim in an input text against a library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub trust_score: f64,
    pub verdicts: Vec<ClaimVerdict>,
    pub counts: VerdictCounts,
}
