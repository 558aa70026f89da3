//! The language-model client contract and its HTTP (OpenAI-chat-compatible)
//! implementation, grounded on `ingest-search`'s `HttpEmbeddingProvider` —
//! same request/retry/backoff shape, swapped from an embeddings endpoint to
//! a chat-completions one.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SummarizerError};

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends a system/user message pair and returns the model's reply text.
    async fn chat(&self, system: &str, user: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct HttpLlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl HttpLlmConfig {
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key: Some(api_key.into()),
            model: model.into(),
            timeout_secs: 120,
            max_retries: 5,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

pub struct HttpLlmClient {
    client: Client,
    config: HttpLlmConfig,
}

impl HttpLlmClient {
    pub fn new(config: HttpLlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SummarizerError::ProviderUnavailable(format!("HTTP client error: {e}")))?;
        Ok(Self { client, config })
    }

    fn chat_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{base}/chat/completions")
        } else {
            format!("{base}/v1/chat/completions")
        }
    }

    async fn send_request(&self, system: &str, user: &str) -> Result<String> {
        let mut request = self.client.post(self.chat_url()).json(&ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
        });

        if let Some(ref api_key) = self.config.api_key {
            request = request.header("Authorization", format!("Bearer {api_key}"));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SummarizerError::ProviderUnavailable("request timed out".into())
            } else {
                SummarizerError::ProviderUnavailable(format!("request failed: {e}"))
            }
        })?;

        match response.status() {
            StatusCode::OK => {
                let parsed: ChatResponse = response
                    .json()
                    .await
                    .map_err(|e| SummarizerError::ProviderUnavailable(format!("invalid response: {e}")))?;
                parsed
                    .choices
                    .into_iter()
                    .next()
                    .map(|c| c.message.content)
                    .ok_or_else(|| SummarizerError::ProviderUnavailable("empty choices".into()))
            }
            StatusCode::UNAUTHORIZED => {
                Err(SummarizerError::Auth(response.text().await.unwrap_or_default()))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(SummarizerError::ProviderUnavailable(format!("status {status}: {body}")))
            }
        }
    }
}

/// `wait_exponential(multiplier=1, min=4, max=120)`'s backoff curve.
fn backoff_delay(attempt: u32) -> Duration {
    let seconds = (4.0_f64 * 2f64.powi(attempt as i32)).clamp(4.0, 120.0);
    Duration::from_secs_f64(seconds)
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn chat(&self, system: &str, user: &str) -> Result<String> {
        let mut last_error = None;

        // Up to 5 attempts, retrying on any exception per the reference
        // implementation's `@retry(stop_after_attempt(5), ...)`.
        for attempt in 0..5u32 {
            match self.send_request(system, user).await {
                Ok(text) => return Ok(text),
                Err(e @ SummarizerError::Auth(_)) => return Err(e),
                Err(e) => {
                    if attempt < 4 {
                        tokio::time::sleep(backoff_delay(attempt)).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(SummarizerError::ProviderUnavailable("exhausted retries".into())))
    }
}
