//! Pipeline configuration.
//!
//! Every knob enumerated in the verification contract lives here, with a
//! `Default` reproducing the documented defaults. `from_env` allows an
//! embedding application to override any of them without recompiling,
//! following the `CLAIM_VERIFY_*` naming convention.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::PipelineError;

/// Tunable knobs for a [`crate::Orchestrator`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Relative tolerance for numeric comparisons.
    pub numeric_tolerance: f64,
    /// Number of evidence passages requested per claim.
    pub top_k: usize,
    /// Minimum cross-encoder score below which reranked retrieval is
    /// treated as "no evidence".
    pub min_rerank_score: f64,
    /// Day window within which overlapping temporal ranges still count
    /// as a Match rather than a Partial.
    pub temporal_match_window_days: i64,
    /// Maximum number of passages included in the LM judge prompt.
    pub judge_max_passages: usize,
    /// Deadline for a single embedding call.
    pub embedding_timeout: Duration,
    /// Deadline for a single LM judge call.
    pub judge_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            numeric_tolerance: 0.05,
            top_k: 5,
            min_rerank_score: 0.3,
            temporal_match_window_days: 7,
            judge_max_passages: 3,
            embedding_timeout: Duration::from_secs(180),
            judge_timeout: Duration::from_secs(120),
        }
    }
}

impl PipelineConfig {
    /// Build a config from the defaults, overridden by any `CLAIM_VERIFY_*`
    /// environment variables that are present.
    pub fn from_env() -> Result<Self, PipelineError> {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("CLAIM_VERIFY_NUMERIC_TOLERANCE") {
            config.numeric_tolerance = v
                .parse()
                .map_err(|_| PipelineError::InvalidConfig(format!("numeric_tolerance: {v}")))?;
        }
        if let Ok(v) = std::env::var("CLAIM_VERIFY_TOP_K") {
            config.top_k = v
                .parse()
                .map_err(|_| PipelineError::InvalidConfig(format!("top_k: {v}")))?;
        }
        if let Ok(v) = std::env::var("CLAIM_VERIFY_MIN_RERANK_SCORE") {
            config.min_rerank_score = v
                .parse()
                .map_err(|_| PipelineError::InvalidConfig(format!("min_rerank_score: {v}")))?;
        }
        if let Ok(v) = std::env::var("CLAIM_VERIFY_TEMPORAL_MATCH_WINDOW_DAYS") {
            config.temporal_match_window_days = v.parse().map_err(|_| {
                PipelineError::InvalidConfig(format!("temporal_match_window_days: {v}"))
            })?;
        }
        if let Ok(v) = std::env::var("CLAIM_VERIFY_JUDGE_MAX_PASSAGES") {
            config.judge_max_passages = v
                .parse()
                .map_err(|_| PipelineError::InvalidConfig(format!("judge_max_passages: {v}")))?;
        }
        if let Ok(v) = std::env::var("CLAIM_VERIFY_EMBEDDING_TIMEOUT_SECS") {
            let secs: u64 = v
                .parse()
                .map_err(|_| PipelineError::InvalidConfig(format!("embedding_timeout: {v}")))?;
            config.embedding_timeout = Duration::from_secs(secs);
        }
        if let Ok(v) = std::env::var("CLAIM_VERIFY_JUDGE_TIMEOUT_SECS") {
            let secs: u64 = v
                .parse()
                .map_err(|_| PipelineError::InvalidConfig(format!("judge_timeout: {v}")))?;
            config.judge_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), PipelineError> {
        if !(0.0..=1.0).contains(&self.numeric_tolerance) {
            return Err(PipelineError::InvalidConfig(
                "numeric_tolerance must be in [0, 1]".into(),
            ));
        }
        if self.top_k == 0 {
            return Err(PipelineError::InvalidConfig(
                "top_k must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_rerank_score) {
            return Err(PipelineError::InvalidConfig(
                "min_rerank_score must be in [0, 1]".into(),
            ));
        }
        Ok(())
    }
}
