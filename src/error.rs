//! Error taxonomy for the verification pipeline.
//!
//! Service-boundary failures (embedding, vector search, rerank, judge) are
//! localized to a single claim and absorbed into a fallback verdict; they
//! are carried as `anyhow::Error` at the trait boundary and never reach the
//! caller of [`crate::Orchestrator::verify`]. `PipelineError` is reserved
//! for the small set of failures that are programmer errors rather than
//! claim-level outcomes.

use thiserror::Error;

/// Errors that propagate out of the pipeline instead of being absorbed
/// into a per-claim verdict.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
