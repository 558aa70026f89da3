//! The embedding provider contract and its HTTP implementation.
//!
//! Collapsed from the teacher's `EmbeddingProvider` trait — which exposed
//! separate `encode_semantic`/`encode_code` methods for its dual
//! Candle-local/remote-API setup — down to a single `embed` call backed by
//! one OpenAI-compatible HTTP endpoint, grounded on the teacher's
//! `OpenAIProvider` (request/retry/backoff shape, dimension auto-detection).
//! Per-call rate limiting is the caller's job via
//! `ingest_core::concurrency::RateBudget`, not this provider's.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds `texts` in request order; returns one vector per input.
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Dimensionality of vectors this provider returns. Reliable only after
    /// the first successful `embed` call if not yet known in advance.
    fn embedding_dim(&self) -> usize;
}

#[derive(Debug, Clone)]
pub struct HttpProviderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub azure_mode: bool,
}

impl HttpProviderConfig {
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key: Some(api_key.into()),
            model: "text-embedding-3-small".into(),
            timeout_secs: 30,
            max_retries: 3,
            azure_mode: false,
        }
    }

    pub fn ollama() -> Self {
        Self {
            base_url: "http://localhost:11434/v1".into(),
            api_key: None,
            model: "nomic-embed-text".into(),
            timeout_secs: 30,
            max_retries: 3,
            azure_mode: false,
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

pub struct HttpEmbeddingProvider {
    client: Client,
    config: HttpProviderConfig,
    dimension: AtomicUsize,
}

impl HttpEmbeddingProvider {
    pub fn new(config: HttpProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SearchError::ProviderUnavailable(format!("HTTP client error: {e}")))?;
        Ok(Self {
            client,
            config,
            dimension: AtomicUsize::new(0),
        })
    }

    fn embeddings_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{base}/embeddings")
        } else {
            format!("{base}/v1/embeddings")
        }
    }

    async fn send_request(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let mut request = self
            .client
            .post(self.embeddings_url())
            .header("Content-Type", "application/json")
            .json(&EmbeddingsRequest {
                model: self.config.model.clone(),
                input: texts,
            });

        if let Some(ref api_key) = self.config.api_key {
            request = if self.config.azure_mode {
                request.header("api-key", api_key)
            } else {
                request.header("Authorization", format!("Bearer {api_key}"))
            };
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SearchError::ProviderUnavailable("request timed out".into())
            } else {
                SearchError::ProviderUnavailable(format!("request failed: {e}"))
            }
        })?;

        match response.status() {
            StatusCode::OK => {
                let parsed: EmbeddingsResponse = response
                    .json()
                    .await
                    .map_err(|e| SearchError::ProviderUnavailable(format!("invalid response: {e}")))?;
                let embeddings: Vec<Vec<f32>> = parsed.data.into_iter().map(|d| d.embedding).collect();

                if let Some(first) = embeddings.first() {
                    let dim = first.len();
                    let cached = self.dimension.load(Ordering::Relaxed);
                    if cached == 0 {
                        self.dimension.store(dim, Ordering::Relaxed);
                    } else if cached != dim {
                        return Err(SearchError::DimensionMismatch { expected: cached, actual: dim });
                    }
                }
                Ok(embeddings)
            }
            StatusCode::UNAUTHORIZED => {
                Err(SearchError::Auth(response.text().await.unwrap_or_default()))
            }
            StatusCode::NOT_FOUND => {
                Err(SearchError::InvalidModel(response.text().await.unwrap_or_default()))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok());
                Err(SearchError::RateLimited { retry_after })
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(SearchError::ProviderUnavailable(format!("status {status}: {body}")))
            }
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut delay = Duration::from_millis(500);
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self.send_request(texts.clone()).await {
                Ok(embeddings) => return Ok(embeddings),
                Err(e @ (SearchError::Auth(_) | SearchError::InvalidModel(_))) => return Err(e),
                Err(e) => {
                    if attempt < self.config.max_retries {
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| SearchError::ProviderUnavailable("exhausted retries".into())))
    }

    fn embedding_dim(&self) -> usize {
        let dim = self.dimension.load(Ordering::Relaxed);
        if dim > 0 {
            dim
        } else {
            match self.config.model.as_str() {
                "text-embedding-3-small" | "text-embedding-ada-002" => 1536,
                "text-embedding-3-large" => 3072,
                "nomic-embed-text" => 768,
                _ => 768,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn mock_response(dim: usize, count: usize) -> serde_json::Value {
        let data: Vec<serde_json::Value> = (0..count)
            .map(|_| serde_json::json!({"embedding": vec![0.1_f32; dim]}))
            .collect();
        serde_json::json!({"data": data})
    }

    fn test_config(server: &MockServer) -> HttpProviderConfig {
        HttpProviderConfig {
            base_url: server.uri(),
            api_key: Some("test-key".into()),
            model: "test-model".into(),
            timeout_secs: 5,
            max_retries: 1,
            azure_mode: false,
        }
    }

    #[tokio::test]
    async fn embeds_and_detects_dimension() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(mock_response(768, 1)))
            .mount(&server)
            .await;

        let provider = HttpEmbeddingProvider::new(test_config(&server)).unwrap();
        let result = provider.embed(vec!["hello".into()]).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].len(), 768);
        assert_eq!(provider.embedding_dim(), 768);
    }

    #[tokio::test]
    async fn auth_failure_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let provider = HttpEmbeddingProvider::new(test_config(&server)).unwrap();
        let result = provider.embed(vec!["hello".into()]).await;
        assert!(matches!(result, Err(SearchError::Auth(_))));
    }

    #[tokio::test]
    async fn empty_input_short_circuits() {
        let server = MockServer::start().await;
        let provider = HttpEmbeddingProvider::new(test_config(&server)).unwrap();
        let result = provider.embed(vec![]).await.unwrap();
        assert!(result.is_empty());
    }
}
