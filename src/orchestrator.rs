//! Stage 6: Pipeline Orchestrator — drives C1–C5 per input and aggregates
//! verdicts into a trust score and summary counts.

use std::sync::Arc;

use tracing::{info, info_span, Instrument};

use crate::comparator::Comparator;
use crate::config::PipelineConfig;
use crate::extractor::{NlpModel, StructureExtractor, StubNlpModel};
use crate::retrieval::EvidenceRetriever;
use crate::segmenter::{RuleBasedSegmenter, Segmenter};
use crate::services::{ChatClient, EmbeddingClient, Reranker, VectorStore};
use crate::types::{ClaimVerdict, Verdict, VerdictCounts, VerificationResult};
use crate::verdict::VerdictGenerator;

/// Drives the full verification pipeline for a single request.
///
/// Holds `Arc` handles to the process-wide singletons (embedding client,
/// vector store, reranker, chat client) so that many concurrent `verify`
/// calls can share them without contention on construction.
pub struct Orchestrator<S: Segmenter = RuleBasedSegmenter, M: NlpModel = StubNlpModel> {
    segmenter: S,
    extractor: StructureExtractor<M>,
    comparator: Comparator,
    retriever: EvidenceRetriever,
    verdict_generator: VerdictGenerator,
    top_k: usize,
}

impl Orchestrator<RuleBasedSegmenter, StubNlpModel> {
    /// Build an orchestrator with the default rule-based segmenter and
    /// stub NLP model, wired to the given external services.
    pub fn new(
        config: &PipelineConfig,
        embedding_client: Arc<dyn EmbeddingClient>,
        vector_store: Arc<dyn VectorStore>,
        reranker: Option<Arc<dyn Reranker>>,
        chat_client: Arc<dyn ChatClient>,
    ) -> Self {
        Self {
            segmenter: RuleBasedSegmenter,
            extractor: StructureExtractor::default(),
            comparator: Comparator::new(config.numeric_tolerance, config.temporal_match_window_days),
            retriever: EvidenceRetriever::new(
                embedding_client,
                vector_store,
                reranker,
                config.min_rerank_score,
                config.embedding_timeout,
                // Reranking shares the judge call's timeout budget; there is
                // no separate knob for it.
                config.judge_timeout,
            ),
            verdict_generator: VerdictGenerator::new(
                chat_client,
                config.judge_max_passages,
                config.judge_timeout,
            ),
            top_k: config.top_k,
        }
    }
}

impl<S: Segmenter, M: NlpModel> Orchestrator<S, M> {
    /// Verify every claim in `input_text` against `library_id`.
    pub async fn verify(&self, input_text: &str, library_id: &str) -> VerificationResult {
        async {
            let claims = self.segmenter.segment(input_text);
            info!(claim_count = claims.len(), "segmented input into claims");

            if claims.is_empty() {
                return VerificationResult {
                    trust_score: 0.0,
                    verdicts: Vec::new(),
                    counts: VerdictCounts::default(),
                };
            }

            let mut verdicts = Vec::with_capacity(claims.len());
            for claim_text in &claims {
                verdicts.push(self.verify_one(claim_text, library_id).await);
            }

            let trust_score = aggregate_trust_score(&verdicts);
            let counts = VerdictCounts::tally(&verdicts);

            info!(
                trust_score,
                total = counts.total,
                supported = counts.supported,
                "verification complete"
            );

            VerificationResult {
                trust_score,
                verdicts,
                counts,
            }
        }
        .instrument(info_span!("verify", library_id))
        .await
    }

    async fn verify_one(&self, claim_text: &str, library_id: &str) -> ClaimVerdict {
        let claim_structure = self.extractor.extract(claim_text);
        let passages = self
            .retriever
            .retrieve(claim_text, library_id, self.top_k)
            .await;

        if passages.is_empty() {
            return ClaimVerdict {
                claim_text: claim_text.to_string(),
                verdict: Verdict::NoEvidence,
                confidence: 0.95,
                evidence_text: String::new(),
                evidence_source: String::new(),
                evidence_page: None,
                reason: "No relevant passages found in your documents.".to_string(),
                used_llm: false,
                contradiction_type: None,
            };
        }

        let evidence_structure = self.extractor.extract(&passages[0].text);
        let comparison = self.comparator.compare(&claim_structure, &evidence_structure);
        self.verdict_generator
            .generate(&claim_structure, &passages, &comparison)
            .await
    }
}

fn aggregate_trust_score(verdicts: &[ClaimVerdict]) -> f64 {
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;

    for verdict in verdicts {
        let weight = match verdict.verdict {
            Verdict::Supported => 1.0,
            Verdict::Partial => 0.6,
            Verdict::Contradicted => 0.0,
            Verdict::NoEvidence => continue,
        };
        weighted_sum += weight * verdict.confidence;
        total_weight += verdict.confidence;
    }

    if total_weight > 0.0 {
        (weighted_sum / total_weight * 100.0).round() / 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{ChatMessage, VectorHit};
    use async_trait::async_trait;

    struct FakeEmbedding;

    #[async_trait]
    impl EmbeddingClient for FakeEmbedding {
        async fn embed_one(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
            Ok(vec![0.1, 0.2])
        }
        async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.1, 0.2]).collect())
        }
    }

    struct FakeVectorStore(Vec<VectorHit>);

    #[async_trait]
    impl VectorStore for FakeVectorStore {
        async fn search(
            &self,
            _library_id: &str,
            _query_embedding: &[f32],
            _n: usize,
        ) -> anyhow::Result<Vec<VectorHit>> {
            Ok(self.0.clone())
        }
    }

    struct EmptyVectorStore;

    #[async_trait]
    impl VectorStore for EmptyVectorStore {
        async fn search(
            &self,
            _library_id: &str,
            _query_embedding: &[f32],
            _n: usize,
        ) -> anyhow::Result<Vec<VectorHit>> {
            Ok(Vec::new())
        }
    }

    struct UnusedChat;

    #[async_trait]
    impl ChatClient for UnusedChat {
        async fn chat(&self, _m: &[ChatMessage], _t: f64, _mt: u32) -> anyhow::Result<String> {
            anyhow::bail!("judge should not be invoked in this scenario")
        }
    }

    fn hit(text: &str, title: &str, distance: f64) -> VectorHit {
        VectorHit {
            text: text.to_string(),
            document_id: Some("doc-1".to_string()),
            document_title: title.to_string(),
            start_page: Some(4),
            distance,
        }
    }

    fn make_orchestrator(store: impl VectorStore + 'static) -> Orchestrator {
        Orchestrator::new(
            &PipelineConfig::default(),
            Arc::new(FakeEmbedding),
            Arc::new(store),
            None,
            Arc::new(UnusedChat),
        )
    }

    #[tokio::test]
    async fn empty_input_yields_empty_result() {
        let orchestrator = make_orchestrator(EmptyVectorStore);
        let result = orchestrator.verify("", "lib-1").await;
        assert!(result.verdicts.is_empty());
        assert_eq!(result.trust_score, 0.0);
        assert_eq!(result.counts.total, 0);
    }

    #[tokio::test]
    async fn questions_only_yield_empty_result() {
        let orchestrator = make_orchestrator(EmptyVectorStore);
        let result = orchestrator.verify("Did revenue grow this quarter?", "lib-1").await;
        assert!(result.verdicts.is_empty());
    }

    #[tokio::test]
    async fn numeric_match_is_supported() {
        let orchestrator = make_orchestrator(FakeVectorStore(vec![hit(
            "Revenue reached $5.1M in Q3 2024.",
            "10-K Filing",
            0.05,
        )]));
        let result = orchestrator
            .verify("Revenue was $5M in Q3 2024.", "lib-1")
            .await;
        assert_eq!(result.counts.total, 1);
        assert_eq!(result.verdicts[0].verdict, Verdict::Supported);
        assert!(!result.verdicts[0].used_llm);
        assert!(result.verdicts[0].confidence >= 0.9);
        assert_eq!(result.verdicts[0].evidence_source, "10-K Filing");
    }

    #[tokio::test]
    async fn numeric_contradiction_is_contradicted() {
        let orchestrator = make_orchestrator(FakeVectorStore(vec![hit(
            "Revenue was $1.08T.",
            "Q3 Statement",
            0.05,
        )]));
        let result = orchestrator.verify("Revenue was $5M.", "lib-1").await;
        assert_eq!(result.verdicts[0].verdict, Verdict::Contradicted);
        assert_eq!(
            result.verdicts[0].contradiction_type,
            Some(crate::types::ContradictionType::Magnitude)
        );
        assert!((result.verdicts[0].confidence - 0.9).abs() < 0.05);
    }

    #[tokio::test]
    async fn temporal_partial_is_partial() {
        let orchestrator = make_orchestrator(FakeVectorStore(vec![hit(
            "Sales grew in 2024.",
            "Annual Report",
            0.05,
        )]));
        let result = orchestrator
            .verify("Sales grew in Q3 2024.", "lib-1")
            .await;
        assert_eq!(result.verdicts[0].verdict, Verdict::Partial);
        assert_eq!(
            result.verdicts[0].contradiction_type,
            Some(crate::types::ContradictionType::Temporal)
        );
        assert_eq!(result.verdicts[0].confidence, 0.7);
    }

    #[tokio::test]
    async fn polarity_contradiction_is_contradicted() {
        let orchestrator = make_orchestrator(FakeVectorStore(vec![hit(
            "The company is not profitable.",
            "Investor Letter",
            0.05,
        )]));
        let result = orchestrator
            .verify("The company is profitable.", "lib-1")
            .await;
        assert_eq!(result.verdicts[0].verdict, Verdict::Contradicted);
        assert_eq!(
            result.verdicts[0].contradiction_type,
            Some(crate::types::ContradictionType::Negation)
        );
        assert_eq!(result.verdicts[0].confidence, 0.85);
    }

    #[tokio::test]
    async fn no_evidence_when_retrieval_is_empty() {
        let orchestrator = make_orchestrator(EmptyVectorStore);
        let result = orchestrator
            .verify("Revenue was $5M in Q3 2024.", "lib-1")
            .await;
        assert_eq!(result.verdicts[0].verdict, Verdict::NoEvidence);
        assert_eq!(result.verdicts[0].confidence, 0.95);
        assert!(!result.verdicts[0].used_llm);
        assert_eq!(result.verdicts[0].evidence_text, "");
    }

    #[tokio::test]
    async fn mixed_aggregation_excludes_no_evidence() {
        // Two synthetic verdicts aggregated directly, matching the documented mixed-aggregation case.
        let verdicts = vec![
            ClaimVerdict {
                claim_text: "a".to_string(),
                verdict: Verdict::Supported,
                confidence: 1.0,
                evidence_text: "e".to_string(),
                evidence_source: "s".to_string(),
                evidence_page: None,
                reason: "r".to_string(),
                used_llm: false,
                contradiction_type: None,
            },
            ClaimVerdict {
                claim_text: "b".to_string(),
                verdict: Verdict::Contradicted,
                confidence: 1.0,
                evidence_text: "e".to_string(),
                evidence_source: "s".to_string(),
                evidence_page: None,
                reason: "r".to_string(),
                used_llm: false,
                contradiction_type: None,
            },
        ];
        assert_eq!(aggregate_trust_score(&verdicts), 0.5);

        let mut with_no_evidence = verdicts;
        with_no_evidence.push(ClaimVerdict {
            claim_text: "c".to_string(),
            verdict: Verdict::NoEvidence,
            confidence: 0.95,
            evidence_text: String::new(),
            evidence_source: String::new(),
            evidence_page: None,
            reason: "r".to_string(),
            used_llm: false,
            contradiction_type: None,
        });
        assert_eq!(aggregate_trust_score(&with_no_evidence), 0.5);
    }

    #[tokio::test]
    async fn all_no_evidence_yields_zero_trust_score() {
        let orchestrator = make_orchestrator(EmptyVectorStore);
        let result = orchestrator
            .verify("Revenue was $5M. Margins rose 12%.", "lib-1")
            .await;
        assert!(result
            .verdicts
            .iter()
            .all(|v| v.verdict == Verdict::NoEvidence));
        assert_eq!(result.trust_score, 0.0);
    }
}
