//! Embedding service HTTP client.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{EmbedError, EmbedResult};
use crate::provider::EmbeddingProvider;
use crate::types::{EmbedImagesRequest, EmbedResponse, EmbedTextRequest, HealthResponse};

/// Configuration for the embedding client.
#[derive(Debug, Clone)]
pub struct EmbeddingClientConfig {
    /// Base URL of the embedding service
    pub base_url: String,
    /// Model the service must serve
    pub model: String,
    /// Expected vector dimension
    pub dimension: usize,
    /// Request timeout
    pub timeout: Duration,
    /// Max retries
    pub max_retries: u32,
    /// Max images per HTTP request
    pub batch_size: usize,
}

impl Default for EmbeddingClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            model: "clip-ViT-B-32".to_string(),
            dimension: 512,
            timeout: Duration::from_secs(300), // large frame batches on CPU
            max_retries: 2,
            batch_size: 64,
        }
    }
}

impl EmbeddingClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("EMBEDDING_SERVICE_URL").unwrap_or(defaults.base_url),
            model: std::env::var("EMBEDDING_MODEL").unwrap_or(defaults.model),
            dimension: std::env::var("EMBEDDING_DIMENSION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.dimension),
            timeout: Duration::from_secs(
                std::env::var("EMBEDDING_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            max_retries: std::env::var("EMBEDDING_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            batch_size: std::env::var("EMBEDDING_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.batch_size),
        }
    }
}

/// Client for the embedding service.
pub struct EmbeddingClient {
    http: Client,
    config: EmbeddingClientConfig,
}

impl EmbeddingClient {
    /// Create a new embedding client.
    pub fn new(config: EmbeddingClientConfig) -> EmbedResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(EmbedError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> EmbedResult<Self> {
        Self::new(EmbeddingClientConfig::from_env())
    }

    pub fn config(&self) -> &EmbeddingClientConfig {
        &self.config
    }

    /// Check if the embedding service is healthy.
    pub async fn health_check(&self) -> EmbedResult<bool> {
        let url = format!("{}/health", self.config.base_url);

        match self.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                let health: HealthResponse = response.json().await?;
                Ok(health.status == "healthy" || health.status == "ok")
            }
            Ok(response) => {
                warn!("Embedding service health check failed: {}", response.status());
                Ok(false)
            }
            Err(e) => {
                warn!("Embedding service health check error: {}", e);
                Ok(false)
            }
        }
    }

    /// POST a batch and validate the returned vectors.
    async fn embed<B: Serialize + Sync>(
        &self,
        endpoint: &str,
        body: &B,
        expected: usize,
    ) -> EmbedResult<Vec<Vec<f32>>> {
        let url = format!("{}{}", self.config.base_url, endpoint);

        debug!(url = %url, inputs = expected, "Sending embedding request");

        let response = self
            .with_retry(|| async {
                let response = self
                    .http
                    .post(&url)
                    .json(body)
                    .send()
                    .await
                    .map_err(EmbedError::Network)?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(EmbedError::from_http_status(status.as_u16(), body));
                }

                Ok::<_, EmbedError>(response.json::<EmbedResponse>().await?)
            })
            .await?;

        self.check_response(response, expected)
    }

    /// Check model, count and dimension of a response.
    fn check_response(&self, response: EmbedResponse, expected: usize) -> EmbedResult<Vec<Vec<f32>>> {
        if response.model != self.config.model {
            return Err(EmbedError::ModelMismatch {
                expected: self.config.model.clone(),
                actual: response.model,
            });
        }

        if response.embeddings.len() != expected {
            return Err(EmbedError::invalid_response(format!(
                "expected {} embeddings, got {}",
                expected,
                response.embeddings.len()
            )));
        }

        if let Some((i, v)) = response
            .embeddings
            .iter()
            .enumerate()
            .find(|(_, v)| v.len() != self.config.dimension)
        {
            return Err(EmbedError::invalid_response(format!(
                "embedding {} has dimension {}, expected {}",
                i,
                v.len(),
                self.config.dimension
            )));
        }

        Ok(response.embeddings)
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> EmbedResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = EmbedResult<T>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                    warn!(
                        "Embedding request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl EmbeddingProvider for EmbeddingClient {
    fn model_id(&self) -> &str {
        &self.config.model
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    async fn encode_images(&self, images: &[PathBuf]) -> EmbedResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(images.len());

        for chunk in images.chunks(self.config.batch_size.max(1)) {
            let mut encoded = Vec::with_capacity(chunk.len());
            for path in chunk {
                let bytes = tokio::fs::read(path).await.map_err(|source| EmbedError::ImageRead {
                    path: path.clone(),
                    source,
                })?;
                encoded.push(BASE64.encode(bytes));
            }

            let request = EmbedImagesRequest {
                model: self.config.model.clone(),
                images: encoded,
            };
            embeddings.extend(self.embed("/embed/images", &request, chunk.len()).await?);
        }

        Ok(embeddings)
    }

    async fn encode_texts(&self, texts: &[String]) -> EmbedResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbedTextRequest {
            model: self.config.model.clone(),
            texts: texts.to_vec(),
        };
        self.embed("/embed/text", &request, texts.len()).await
    }
}
