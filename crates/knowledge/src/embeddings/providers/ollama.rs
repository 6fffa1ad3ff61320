//! Ollama embedding provider.
//!
//! Uses the batch endpoint `POST /api/embed` with `{model, input: [..]}`.
//! Large inputs are sent in `batch_size` slices; a failed slice fails the
//! whole call, there are no retries.

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use iamsage_core::{AppError, AppResult};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const EMBED_ENDPOINT: &str = "/api/embed";

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Ollama embedding provider using the local API
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaEmbedder {
    /// Create a provider for `model` served at `base_url`.
    ///
    /// No request is made here; an unreachable server surfaces on first use.
    pub fn new(
        base_url: &str,
        model: &str,
        dimensions: usize,
        batch_size: usize,
    ) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                AppError::Config(format!("Failed to create HTTP client for Ollama: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dimensions,
            batch_size: batch_size.max(1),
        })
    }

    #[instrument(skip(self, texts), fields(count = texts.len(), model = %self.model))]
    async fn embed_slice(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let url = format!("{}{}", self.base_url, EMBED_ENDPOINT);
        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        debug!("Sending embedding request to {}", url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                AppError::Embedding(format!(
                    "Ollama not available at {}: {}. Ensure Ollama is running and model '{}' is installed.",
                    self.base_url, e, self.model
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);

            let hint = if status == StatusCode::NOT_FOUND {
                format!(" Run: ollama pull {}", self.model)
            } else {
                String::new()
            };

            return Err(AppError::Embedding(format!(
                "Ollama API error ({}): {}.{}",
                status, detail, hint
            )));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to parse Ollama response: {}", e)))?;

        if body.embeddings.len() != texts.len() {
            return Err(AppError::Embedding(format!(
                "Ollama returned {} embeddings for {} inputs",
                body.embeddings.len(),
                texts.len()
            )));
        }

        if let Some(bad) = body.embeddings.iter().find(|e| e.len() != self.dimensions) {
            return Err(AppError::Embedding(format!(
                "Model '{}' returned {} dimensions, expected {}. Update embedding.dimensions in the config.",
                self.model,
                bad.len(),
                self.dimensions
            )));
        }

        Ok(body.embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for slice in texts.chunks(self.batch_size) {
            embeddings.extend(self.embed_slice(slice).await?);
        }

        debug!("Embedded {} texts with {}", embeddings.len(), self.model);

        Ok(embeddings)
    }
}
