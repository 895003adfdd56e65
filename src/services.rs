//! Narrow contracts for the four external collaborators: embedding
//! service, vector store, reranker, and chat LM. The core never owns an
//! implementation of the vector store or reranker — those are genuinely
//! external systems reached only through these traits. A single concrete
//! adapter, [`HttpLlmClient`], is provided for the embedding and chat
//! contracts against an OpenAI-compatible endpoint, grounded in the
//! original `LLMProvider`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Embeds query and chunk text into a shared vector space.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed_one(&self, text: &str) -> anyhow::Result<Vec<f32>>;
    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// A single nearest-neighbor hit returned by the vector store.
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub text: String,
    pub document_id: Option<String>,
    pub document_title: String,
    pub start_page: Option<u32>,
    /// Cosine distance in `[0, 2]`; similarity is `1 - distance`.
    pub distance: f64,
}

/// Nearest-neighbor search over chunk embeddings, scoped to a library.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn search(
        &self,
        library_id: &str,
        query_embedding: &[f32],
        n: usize,
    ) -> anyhow::Result<Vec<VectorHit>>;
}

/// A single reranked result: the index into the input passage slice, and
/// its cross-encoder score.
#[derive(Debug, Clone, Copy)]
pub struct RerankHit {
    pub index: usize,
    pub score: f64,
}

/// Cross-encoder reranking of retrieved passages against the query.
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn rerank(&self, query: &str, passages: &[String]) -> anyhow::Result<Vec<RerankHit>>;
}

/// A single chat message in the LM judge prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat/judge language model, used only by the verdict generator's
/// fallback path.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        temperature: f64,
        max_tokens: u32,
    ) -> anyhow::Result<String>;
}

/// Which OpenAI-compatible surface [`HttpLlmClient`] is configured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provider {
    OpenRouter,
    Ollama,
    Custom,
}

/// Configuration for [`HttpLlmClient`], mirroring the original
/// `LLMConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpLlmConfig {
    pub provider: Provider,
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
}

impl Default for HttpLlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::OpenRouter,
            api_key: None,
            base_url: "https://openrouter.ai/api/v1".to_string(),
            chat_model: "openrouter/auto".to_string(),
            embedding_model: "openai/text-embedding-3-small".to_string(),
        }
    }
}

/// Default embedding/chat adapter against an OpenAI-compatible HTTP
/// surface (OpenRouter, Ollama, or a custom endpoint).
pub struct HttpLlmClient {
    client: reqwest::Client,
    config: HttpLlmConfig,
}

impl HttpLlmClient {
    pub fn new(config: HttpLlmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn chat_url(&self) -> String {
        match self.config.provider {
            Provider::Ollama => format!("{}/v1/chat/completions", self.config.base_url),
            _ => format!("{}/chat/completions", self.config.base_url),
        }
    }

    fn embeddings_url(&self) -> String {
        match self.config.provider {
            Provider::Ollama => format!("{}/v1/embeddings", self.config.base_url),
            _ => format!("{}/embeddings", self.config.base_url),
        }
    }

    fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) if !key.is_empty() => builder.bearer_auth(key),
            _ => builder,
        }
    }
}

#[async_trait]
impl ChatClient for HttpLlmClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        temperature: f64,
        max_tokens: u32,
    ) -> anyhow::Result<String> {
        let body = serde_json::json!({
            "model": self.config.chat_model,
            "messages": messages,
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        let request = self.apply_auth(self.client.post(self.chat_url()).json(&body));
        let response = request.send().await?;
        if !response.status().is_success() {
            anyhow::bail!("chat completion request failed: {}", response.status());
        }

        let payload: serde_json::Value = response.json().await?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("chat completion response missing content"))?;
        Ok(content.to_string())
    }
}

#[async_trait]
impl EmbeddingClient for HttpLlmClient {
    async fn embed_one(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut batch = self.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        batch
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedding response was empty"))
    }

    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::json!({
            "model": self.config.embedding_model,
            "input": texts,
        });

        let request = self.apply_auth(self.client.post(self.embeddings_url()).json(&body));
        let response = request.send().await?;
        if !response.status().is_success() {
            warn!("embedding request failed with status {}", response.status());
            anyhow::bail!("embedding request failed: {}", response.status());
        }

        let payload: serde_json::Value = response.json().await?;
        let data = payload["data"]
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("embedding response missing data array"))?;

        data.iter()
            .map(|item| {
                item["embedding"]
                    .as_array()
                    .ok_or_else(|| anyhow::anyhow!("embedding item missing vector"))
                    .map(|vec| vec.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect())
            })
            .collect()
    }
}
