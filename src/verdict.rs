//! Stage 5: Verdict Generator — combine comparison and retrieval into a
//! final per-claim verdict, escalating to an LM judge when the structural
//! comparison is inconclusive.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::warn;

use crate::services::{ChatClient, ChatMessage};
use crate::types::{
    ClaimStructure, ClaimVerdict, Comparison, ComparisonResult, EvidencePassage, Verdict,
};

/// Generates a [`ClaimVerdict`] from structural comparison output,
/// falling back to a chat LM judge when the comparator returns
/// [`ComparisonResult::NoComparison`].
pub struct VerdictGenerator {
    chat_client: Arc<dyn ChatClient>,
    judge_max_passages: usize,
    judge_timeout: Duration,
}

impl VerdictGenerator {
    pub fn new(
        chat_client: Arc<dyn ChatClient>,
        judge_max_passages: usize,
        judge_timeout: Duration,
    ) -> Self {
        Self {
            chat_client,
            judge_max_passages,
            judge_timeout,
        }
    }

    pub async fn generate(
        &self,
        claim: &ClaimStructure,
        evidence: &[EvidencePassage],
        comparison: &Comparison,
    ) -> ClaimVerdict {
        if evidence.is_empty() {
            return ClaimVerdict {
                claim_text: claim.text.clone(),
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

        let best = &evidence[0];

        match comparison.result {
            ComparisonResult::Match => ClaimVerdict {
                claim_text: claim.text.clone(),
                verdict: Verdict::Supported,
                confidence: comparison.confidence,
                evidence_text: best.text.clone(),
                evidence_source: best.source.clone(),
                evidence_page: best.page,
                reason: comparison.explanation.clone(),
                used_llm: false,
                contradiction_type: None,
            },
            ComparisonResult::Contradiction => ClaimVerdict {
                claim_text: claim.text.clone(),
                verdict: Verdict::Contradicted,
                confidence: comparison.confidence,
                evidence_text: best.text.clone(),
                evidence_source: best.source.clone(),
                evidence_page: best.page,
                reason: comparison.explanation.clone(),
                used_llm: false,
                contradiction_type: comparison.contradiction_type,
            },
            ComparisonResult::Partial => ClaimVerdict {
                claim_text: claim.text.clone(),
                verdict: Verdict::Partial,
                confidence: comparison.confidence,
                evidence_text: best.text.clone(),
                evidence_source: best.source.clone(),
                evidence_page: best.page,
                reason: comparison.explanation.clone(),
                used_llm: false,
                contradiction_type: comparison.contradiction_type,
            },
            ComparisonResult::NoComparison => self.judge(claim, evidence).await,
        }
    }

    async fn judge(&self, claim: &ClaimStructure, evidence: &[EvidencePassage]) -> ClaimVerdict {
        let best = &evidence[0];
        let prompt = self.build_prompt(claim, evidence);
        let messages = [
            ChatMessage::system(
                "You verify claims against evidence. Follow output format exactly.",
            ),
            ChatMessage::user(prompt),
        ];

        let response = match timeout(
            self.judge_timeout,
            self.chat_client.chat(&messages, 0.0, 300),
        )
        .await
        {
            Ok(Ok(text)) => text,
            Ok(Err(err)) => {
                warn!("LM judge call failed: {}", err);
                return ClaimVerdict {
                    claim_text: claim.text.clone(),
                    verdict: Verdict::NoEvidence,
                    confidence: 0.0,
                    evidence_text: String::new(),
                    evidence_source: String::new(),
                    evidence_page: None,
                    reason: format!("LM judge call failed: {err}"),
                    used_llm: true,
                    contradiction_type: None,
                };
            }
            Err(_) => {
                warn!("LM judge call timed out");
                return ClaimVerdict {
                    claim_text: claim.text.clone(),
                    verdict: Verdict::NoEvidence,
                    confidence: 0.0,
                    evidence_text: String::new(),
                    evidence_source: String::new(),
                    evidence_page: None,
                    reason: "LM judge call timed out.".to_string(),
                    used_llm: true,
                    contradiction_type: None,
                };
            }
        };

        let (verdict, confidence, reason) = parse_judge_response(&response);

        ClaimVerdict {
            claim_text: claim.text.clone(),
            verdict,
            confidence,
            evidence_text: best.text.clone(),
            evidence_source: best.source.clone(),
            evidence_page: best.page,
            reason,
            used_llm: true,
            contradiction_type: None,
        }
    }

    fn build_prompt(&self, claim: &ClaimStructure, evidence: &[EvidencePassage]) -> String {
        let evidence_block = evidence
            .iter()
            .take(self.judge_max_passages)
            .map(|p| {
                let page = p
                    .page
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "?".to_string());
                format!("[{}, page {}]: {}", p.source, page, p.text)
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            "You are verifying a claim against source documents.\n\n\
             CLAIM: {}\n\n\
             EVIDENCE FROM DOCUMENTS:\n{}\n\n\
             Based on the evidence, determine:\n\
             1. Does the evidence SUPPORT, CONTRADICT, or PARTIALLY SUPPORT the claim?\n\
             2. If there's no relevant evidence, say NO_EVIDENCE.\n\n\
             Respond in this exact format:\n\
             VERDICT: SUPPORTED|CONTRADICTED|PARTIAL|NO_EVIDENCE\n\
             CONFIDENCE: <float in [0,1]>\n\
             REASON: <single sentence>",
            claim.text, evidence_block
        )
    }
}

fn parse_judge_response(response: &str) -> (Verdict, f64, String) {
    let mut verdict = Verdict::NoEvidence;
    let mut confidence = 0.5;
    let mut reason = "Could not determine from evidence.".to_string();

    for line in response.lines() {
        if let Some(value) = line.strip_prefix("VERDICT:") {
            verdict = match value.trim().to_uppercase().as_str() {
                "SUPPORTED" => Verdict::Supported,
                "CONTRADICTED" => Verdict::Contradicted,
                "PARTIAL" => Verdict::Partial,
                _ => Verdict::NoEvidence,
            };
        } else if let Some(value) = line.strip_prefix("CONFIDENCE:") {
            confidence = value.trim().parse().unwrap_or(0.5).clamp(0.0, 1.0);
        } else if let Some(value) = line.strip_prefix("REASON:") {
            reason = value.trim().to_string();
        }
    }

    (verdict, confidence, reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContradictionType, Polarity};
    use async_trait::async_trait;

    fn claim_structure(text: &str) -> ClaimStructure {
        ClaimStructure {
            text: text.to_string(),
            numeric_values: vec![],
            temporal_values: vec![],
            subject: None,
            polarity: Polarity::Uncertain,
            negation_words: vec![],
            extraction_confidence: 0.7,
        }
    }

    fn passage(text: &str) -> EvidencePassage {
        EvidencePassage {
            text: text.to_string(),
            source: "Doc A".to_string(),
            page: Some(2),
            similarity: 0.9,
            document_id: Some("doc-1".to_string()),
        }
    }

    struct ScriptedChat(String);

    #[async_trait]
    impl ChatClient for ScriptedChat {
        async fn chat(&self, _messages: &[ChatMessage], _t: f64, _m: u32) -> anyhow::Result<String> {
            Ok(self.0.clone())
        }
    }

    struct FailingChat;

    #[async_trait]
    impl ChatClient for FailingChat {
        async fn chat(&self, _messages: &[ChatMessage], _t: f64, _m: u32) -> anyhow::Result<String> {
            anyhow::bail!("judge unreachable")
        }
    }

    fn generator(chat: impl ChatClient + 'static) -> VerdictGenerator {
        VerdictGenerator::new(Arc::new(chat), 3, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn empty_evidence_yields_no_evidence_verdict() {
        let gen = generator(FailingChat);
        let verdict = gen
            .generate(
                &claim_structure("Revenue was $5M."),
                &[],
                &Comparison {
                    result: ComparisonResult::NoComparison,
                    contradiction_type: None,
                    confidence: 0.0,
                    explanation: String::new(),
                },
            )
            .await;
        assert_eq!(verdict.verdict, Verdict::NoEvidence);
        assert_eq!(verdict.confidence, 0.95);
        assert!(!verdict.used_llm);
    }

    #[tokio::test]
    async fn match_comparison_yields_supported() {
        let gen = generator(FailingChat);
        let comparison = Comparison {
            result: ComparisonResult::Match,
            contradiction_type: None,
            confidence: 0.92,
            explanation: "values match".to_string(),
        };
        let verdict = gen
            .generate(&claim_structure("Revenue was $5M."), &[passage("evidence")], &comparison)
            .await;
        assert_eq!(verdict.verdict, Verdict::Supported);
        assert_eq!(verdict.confidence, 0.92);
        assert_eq!(verdict.evidence_source, "Doc A");
        assert!(!verdict.used_llm);
    }

    #[tokio::test]
    async fn contradiction_carries_contradiction_type() {
        let gen = generator(FailingChat);
        let comparison = Comparison {
            result: ComparisonResult::Contradiction,
            contradiction_type: Some(ContradictionType::Magnitude),
            confidence: 0.9,
            explanation: "values differ".to_string(),
        };
        let verdict = gen
            .generate(&claim_structure("Revenue was $5M."), &[passage("evidence")], &comparison)
            .await;
        assert_eq!(verdict.verdict, Verdict::Contradicted);
        assert_eq!(verdict.contradiction_type, Some(ContradictionType::Magnitude));
    }

    #[tokio::test]
    async fn no_comparison_escalates_to_llm_judge() {
        let gen = generator(ScriptedChat(
            "VERDICT: SUPPORTED\nCONFIDENCE: 0.8\nREASON: Evidence aligns with the claim.".to_string(),
        ));
        let comparison = Comparison {
            result: ComparisonResult::NoComparison,
            contradiction_type: None,
            confidence: 0.0,
            explanation: String::new(),
        };
        let verdict = gen
            .generate(&claim_structure("The team is doing well."), &[passage("evidence")], &comparison)
            .await;
        assert!(verdict.used_llm);
        assert_eq!(verdict.verdict, Verdict::Supported);
        assert_eq!(verdict.confidence, 0.8);
    }

    #[tokio::test]
    async fn malformed_judge_response_falls_back_to_defaults() {
        let gen = generator(ScriptedChat("not the expected format".to_string()));
        let comparison = Comparison {
            result: ComparisonResult::NoComparison,
            contradiction_type: None,
            confidence: 0.0,
            explanation: String::new(),
        };
        let verdict = gen
            .generate(&claim_structure("Ambiguous claim."), &[passage("evidence")], &comparison)
            .await;
        assert_eq!(verdict.verdict, Verdict::NoEvidence);
        assert_eq!(verdict.confidence, 0.5);
        assert_eq!(verdict.reason, "Could not determine from evidence.");
    }

    #[tokio::test]
    async fn judge_failure_yields_zero_confidence_no_evidence() {
        let gen = generator(FailingChat);
        let comparison = Comparison {
            result: ComparisonResult::NoComparison,
            contradiction_type: None,
            confidence: 0.0,
            explanation: String::new(),
        };
        let verdict = gen
            .generate(&claim_structure("Ambiguous claim."), &[passage("evidence")], &comparison)
            .await;
        assert_eq!(verdict.verdict, Verdict::NoEvidence);
        assert_eq!(verdict.confidence, 0.0);
        assert!(verdict.used_llm);
    }

    #[tokio::test]
    async fn out_of_range_confidence_is_clamped() {
        let gen = generator(ScriptedChat(
            "VERDICT: PARTIAL\nCONFIDENCE: 1.7\nREASON: Somewhat aligned.".to_string(),
        ));
        let comparison = Comparison {
            result: ComparisonResult::NoComparison,
            contradiction_type: None,
            confidence: 0.0,
            explanation: String::new(),
        };
        let verdict = gen
            .generate(&claim_structure("Ambiguous claim."), &[passage("evidence")], &comparison)
            .await;
        assert_eq!(verdict.confidence, 1.0);
    }
}
