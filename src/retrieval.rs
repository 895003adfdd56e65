//! Stage 4: Evidence Retriever — embed, search, rerank, gate.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::warn;

use crate::services::{EmbeddingClient, Reranker, VectorStore};
use crate::types::EvidencePassage;

/// Retrieves and reranks evidence passages for a single claim.
pub struct EvidenceRetriever {
    embedding_client: Arc<dyn EmbeddingClient>,
    vector_store: Arc<dyn VectorStore>,
    reranker: Option<Arc<dyn Reranker>>,
    min_rerank_score: f64,
    embedding_timeout: Duration,
    rerank_timeout: Duration,
}

impl EvidenceRetriever {
    pub fn new(
        embedding_client: Arc<dyn EmbeddingClient>,
        vector_store: Arc<dyn VectorStore>,
        reranker: Option<Arc<dyn Reranker>>,
        min_rerank_score: f64,
        embedding_timeout: Duration,
        rerank_timeout: Duration,
    ) -> Self {
        Self {
            embedding_client,
            vector_store,
            reranker,
            min_rerank_score,
            embedding_timeout,
            rerank_timeout,
        }
    }

    /// Retrieve up to `top_k` evidence passages for `claim_text` from
    /// `library_id`. Never errors: any downstream failure collapses to an
    /// empty result.
    pub async fn retrieve(&self, claim_text: &str, library_id: &str, top_k: usize) -> Vec<EvidencePassage> {
        let embedding = match timeout(
            self.embedding_timeout,
            self.embedding_client.embed_one(claim_text),
        )
        .await
        {
            Ok(Ok(vector)) => vector,
            Ok(Err(err)) => {
                warn!("embedding failed during retrieval: {}", err);
                return Vec::new();
            }
            Err(_) => {
                warn!("embedding timed out during retrieval");
                return Vec::new();
            }
        };

        let hits = match self
            .vector_store
            .search(library_id, &embedding, top_k * 2)
            .await
        {
            Ok(hits) => hits,
            Err(err) => {
                warn!("vector search failed: {}", err);
                return Vec::new();
            }
        };

        let mut passages: Vec<EvidencePassage> = hits
            .into_iter()
            .map(|hit| EvidencePassage {
                text: hit.text,
                source: hit.document_title,
                page: hit.start_page,
                similarity: (1.0 - hit.distance).clamp(0.0, 1.0),
                document_id: hit.document_id,
            })
            .collect();

        let was_reranked = self.apply_rerank(claim_text, &mut passages).await;
        passages.truncate(top_k);

        if was_reranked {
            if let Some(best) = passages.first() {
                if best.similarity < self.min_rerank_score {
                    return Vec::new();
                }
            }
        }

        passages
    }

    /// Reranks `passages` in place, stable-sorted by (score desc, original
    /// retrieval position asc). Returns whether a reranker was actually
    /// consulted.
    async fn apply_rerank(&self, query: &str, passages: &mut Vec<EvidencePassage>) -> bool {
        let Some(reranker) = &self.reranker else {
            sort_by_similarity(passages);
            return false;
        };

        let texts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
        let rerank_result = match timeout(self.rerank_timeout, reranker.rerank(query, &texts)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("reranking timed out, falling back to similarity order");
                sort_by_similarity(passages);
                return false;
            }
        };

        match rerank_result {
            Ok(hits) => {
                let mut scored: Vec<(usize, f64)> =
                    hits.into_iter().map(|h| (h.index, h.score)).collect();
                scored.sort_by(|a, b| {
                    b.1.partial_cmp(&a.1)
                        .unwrap_or(Ordering::Equal)
                        .then(a.0.cmp(&b.0))
                });

                let mut reranked = Vec::with_capacity(scored.len());
                for (index, score) in scored {
                    if let Some(mut passage) = passages.get(index).cloned() {
                        passage.similarity = score;
                        reranked.push(passage);
                    }
                }
                *passages = reranked;
                true
            }
            Err(err) => {
                warn!("reranking failed, falling back to similarity order: {}", err);
                sort_by_similarity(passages);
                false
            }
        }
    }
}

fn sort_by_similarity(passages: &mut [EvidencePassage]) {
    let original_order: Vec<(usize, EvidencePassage)> =
        passages.iter().cloned().enumerate().collect();
    let mut indexed = original_order;
    indexed.sort_by(|a, b| {
        b.1.similarity
            .partial_cmp(&a.1.similarity)
            .unwrap_or(Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    for (slot, (_, passage)) in passages.iter_mut().zip(indexed.into_iter()) {
        *slot = passage;
    }
}
