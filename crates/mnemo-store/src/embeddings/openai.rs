//! OpenAI-compatible embedding provider
//!
//! Posts `{"model": ..., "input": ...}` to `{base_url}/embeddings` and
//! reads the first entry of `data`. Works against OpenAI, Azure OpenAI,
//! Ollama and compatible gateways.
//!
//! Failure policy: no network or HTTP error escapes this provider.
//! Missing key, transport failure, non-2xx status and malformed bodies
//! all degrade to the deterministic fallback vector, logged at `warn`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::provider::{fallback_embedding, pad_or_truncate, EmbeddingProvider, ProviderKind};
use crate::error::Result;

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for the OpenAI-compatible provider
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Base URL (e.g. "https://api.openai.com/v1")
    pub base_url: String,
    /// API key; `None` forces fallback mode
    pub api_key: Option<String>,
    pub model: String,
    /// Output dimension; responses are padded or truncated to this
    pub dimension: usize,
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    /// Create config for the OpenAI API
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key: Some(api_key.into()),
            model: "text-embedding-3-small".into(),
            dimension: 1536,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// OpenAI-compatible HTTP embedding provider
pub struct OpenAiProvider {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    /// One request; `None` means "use the fallback"
    async fn request_embedding(&self, text: &str) -> Option<Vec<f32>> {
        let api_key = self.config.api_key.as_ref()?;

        let url = format!("{}/embeddings", self.config.base_url.trim_end_matches('/'));
        let body = EmbeddingRequest {
            model: &self.config.model,
            input: text,
        };

        let response = match self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!("Embedding request failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!("Embedding request returned HTTP {}", response.status());
            return None;
        }

        match response.json::<EmbeddingResponse>().await {
            Ok(parsed) => parsed.data.into_iter().next().map(|d| d.embedding),
            Err(e) => {
                warn!("Embedding response malformed: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        match self.request_embedding(text).await {
            Some(vector) => {
                if vector.len() != self.config.dimension {
                    debug!(
                        "Resizing embedding from {} to {}",
                        vector.len(),
                        self.config.dimension
                    );
                }
                Ok(pad_or_truncate(vector, self.config.dimension))
            }
            None => Ok(fallback_embedding(text, self.config.dimension)),
        }
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn provider_kind(&self) -> ProviderKind {
        ProviderKind::Openai
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, dimension: usize) -> OpenAiConfig {
        OpenAiConfig {
            base_url: server.uri(),
            api_key: Some("test-key".into()),
            model: "text-embedding-3-small".into(),
            dimension,
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_successful_embedding() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"embedding": [0.1, 0.2, 0.3, 0.4], "index": 0}]
            })))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new(config_for(&server, 4));
        let vector = provider.embed("hello").await.unwrap();
        assert_eq!(vector, vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[tokio::test]
    async fn test_wrong_dimension_is_padded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"embedding": [0.5, 0.5], "index": 0}]
            })))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new(config_for(&server, 4));
        let vector = provider.embed("hello").await.unwrap();
        assert_eq!(vector, vec![0.5, 0.5, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_http_error_falls_back_deterministically() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new(config_for(&server, 8));
        let a = provider.embed("hello").await.unwrap();
        let b = provider.embed("hello").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
        assert_eq!(a, fallback_embedding("hello", 8));
    }

    #[tokio::test]
    async fn test_missing_api_key_falls_back() {
        let provider = OpenAiProvider::new(OpenAiConfig {
            base_url: "http://localhost:1".into(),
            api_key: None,
            model: "m".into(),
            dimension: 8,
            timeout_secs: 1,
        });
        let vector = provider.embed("offline").await.unwrap();
        assert_eq!(vector, fallback_embedding("offline", 8));
    }
}
