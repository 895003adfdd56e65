//! Deterministic claim verification pipeline.
//!
//! Segments a block of text into atomic claims, extracts a structured
//! representation of each (numerics, temporals, polarity), retrieves
//! evidence passages from a document library, structurally compares claim
//! against evidence, and falls back to an LM judge only when the
//! comparator cannot decide. Per-claim verdicts are aggregated into a
//! single trust score for the input text.

pub mod comparator;
pub mod config;
pub mod error;
pub mod extractor;
pub mod orchestrator;
pub mod retrieval;
pub mod segmenter;
pub mod services;
pub mod types;
pub mod verdict;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use orchestrator::Orchestrator;
pub use services::{ChatClient, ChatMessage, EmbeddingClient, HttpLlmClient, HttpLlmConfig, Provider, Reranker, RerankHit, VectorHit, VectorStore};
pub use types::{
    ClaimStructure, ClaimVerdict, Comparison, ComparisonResult, ContradictionType,
    EvidencePassage, NumericValue, Polarity, TemporalValue, Unit, Verdict, VerdictCounts,
    VerificationResult,
};
