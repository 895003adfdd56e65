//! Stage 3: Comparator — structural comparison of claim vs. evidence.

use crate::types::{ClaimStructure, Comparison, ComparisonResult, ContradictionType, Polarity};

/// Compares two [`ClaimStructure`] values and returns the first
/// non-[`ComparisonResult::NoComparison`] result from the dispatch order
/// Numeric → Temporal → Polarity.
pub struct Comparator {
    numeric_tolerance: f64,
    temporal_match_window_days: i64,
}

impl Default for Comparator {
    fn default() -> Self {
        Self {
            numeric_tolerance: 0.05,
            temporal_match_window_days: 7,
        }
    }
}

impl Comparator {
    pub fn new(numeric_tolerance: f64, temporal_match_window_days: i64) -> Self {
        Self {
            numeric_tolerance,
            temporal_match_window_days,
        }
    }

    pub fn compare(&self, claim: &ClaimStructure, evidence: &ClaimStructure) -> Comparison {
        if let (Some(c), Some(e)) = (claim.numeric_values.first(), evidence.numeric_values.first())
        {
            let result = self.compare_numeric(c, e);
            if result.result != ComparisonResult::NoComparison {
                return result;
            }
        }

        if let (Some(c), Some(e)) = (
            claim.temporal_values.first(),
            evidence.temporal_values.first(),
        ) {
            let result = self.compare_temporal(c, e);
            if result.result != ComparisonResult::NoComparison {
                return result;
            }
        }

        if claim.polarity != Polarity::Uncertain && evidence.polarity != Polarity::Uncertain {
            let result = self.compare_polarity(claim.polarity, evidence.polarity);
            if result.result != ComparisonResult::NoComparison {
                return result;
            }
        }

        Comparison {
            result: ComparisonResult::NoComparison,
            contradiction_type: None,
            confidence: 0.0,
            explanation: "Cannot compare structurally, requires reasoning".to_string(),
        }
    }

    fn compare_numeric(
        &self,
        claim: &crate::types::NumericValue,
        evidence: &crate::types::NumericValue,
    ) -> Comparison {
        if claim.unit != evidence.unit {
            return Comparison {
                result: ComparisonResult::NoComparison,
                contradiction_type: None,
                confidence: 0.0,
                explanation: format!(
                    "Different units: {:?} vs {:?}",
                    claim.unit, evidence.unit
                ),
            };
        }

        if evidence.value.abs() < 1e-10 {
            if claim.value.abs() < 1e-10 {
                return Comparison {
                    result: ComparisonResult::Match,
                    contradiction_type: None,
                    confidence: 0.95,
                    explanation: "Both values are zero".to_string(),
                };
            }
            return Comparison {
                result: ComparisonResult::Contradiction,
                contradiction_type: Some(ContradictionType::Magnitude),
                confidence: 0.95,
                explanation: format!("Claim: {}, Evidence: ~0", claim.raw),
            };
        }

        let diff = (claim.value - evidence.value).abs() / evidence.value.abs();

        if diff <= self.numeric_tolerance {
            Comparison {
                result: ComparisonResult::Match,
                contradiction_type: None,
                confidence: claim.confidence.min(evidence.confidence),
                explanation: format!(
                    "Values match: {} approx {} (within {:.0}% tolerance)",
                    claim.raw,
                    evidence.raw,
                    self.numeric_tolerance * 100.0
                ),
            }
        } else {
            Comparison {
                result: ComparisonResult::Contradiction,
                contradiction_type: Some(ContradictionType::Magnitude),
                confidence: claim.confidence.min(evidence.confidence) * 0.95,
                explanation: format!(
                    "Values differ: claim says {}, evidence says {} ({:.1}% difference)",
                    claim.raw,
                    evidence.raw,
                    diff * 100.0
                ),
            }
        }
    }

    fn compare_temporal(
        &self,
        claim: &crate::types::TemporalValue,
        evidence: &crate::types::TemporalValue,
    ) -> Comparison {
        let overlaps = claim.start <= evidence.end && evidence.start <= claim.end;

        if overlaps {
            let start_diff = (claim.start - evidence.start).num_days().abs();
            let end_diff = (claim.end - evidence.end).num_days().abs();

            if start_diff <= self.temporal_match_window_days
                && end_diff <= self.temporal_match_window_days
            {
                return Comparison {
                    result: ComparisonResult::Match,
                    contradiction_type: None,
                    confidence: claim.confidence.min(evidence.confidence),
                    explanation: format!(
                        "Time periods match: {} approx {}",
                        claim.raw, evidence.raw
                    ),
                };
            }

            return Comparison {
                result: ComparisonResult::Partial,
                contradiction_type: Some(ContradictionType::Temporal),
                confidence: 0.7,
                explanation: format!(
                    "Time periods overlap but differ: {} vs {}",
                    claim.raw, evidence.raw
                ),
            };
        }

        Comparison {
            result: ComparisonResult::Contradiction,
            contradiction_type: Some(ContradictionType::Temporal),
            confidence: claim.confidence.min(evidence.confidence) * 0.9,
            explanation: format!(
                "Time periods do not match: claim says {}, evidence says {}",
                claim.raw, evidence.raw
            ),
        }
    }

    fn compare_polarity(&self, claim: Polarity, evidence: Polarity) -> Comparison {
        if claim == evidence {
            Comparison {
                result: ComparisonResult::Match,
                contradiction_type: None,
                confidence: 0.75,
                explanation: "Statement polarity matches".to_string(),
            }
        } else {
            Comparison {
                result: ComparisonResult::Contradiction,
                contradiction_type: Some(ContradictionType::Negation),
                confidence: 0.85,
                explanation: format!(
                    "Polarity mismatch: claim is {:?}, evidence is {:?}",
                    claim, evidence
                ),
            }
        }
    }
}
