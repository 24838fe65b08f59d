//! Text embeddings through the hosted `/embeddings` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RetrievalError;

/// Inputs per embeddings request.
pub const DEFAULT_BATCH_SIZE: usize = 96;

/// Anything that turns texts into vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn model_name(&self) -> &str;

    /// One vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError>;

    /// Embed a single search query. Caching layers pass queries straight
    /// through so one-off questions are never stored.
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, RetrievalError> {
        self.embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or(RetrievalError::CountMismatch {
                sent: 1,
                received: 0,
            })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// OpenAI-compatible embeddings client.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    model: String,
    batch_size: usize,
}

impl OpenAiEmbedder {
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        model: impl Into<String>,
    ) -> Result<Self, RetrievalError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| RetrievalError::EmbeddingFailed {
                reason: format!("Failed to create HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        let url = format!("{}/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&EmbeddingRequest {
                model: &self.model,
                input: batch,
            })
            .send()
            .await
            .map_err(|e| RetrievalError::EmbeddingFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(RetrievalError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::EmbeddingFailed {
                reason: format!("HTTP {status}: {}", body.chars().take(300).collect::<String>()),
            });
        }

        let parsed: EmbeddingResponse =
            response
                .json()
                .await
                .map_err(|e| RetrievalError::EmbeddingFailed {
                    reason: format!("Invalid embeddings response: {e}"),
                })?;

        order_by_index(parsed.data, batch.len())
    }
}

/// Put returned vectors back in request order.
fn order_by_index(
    data: Vec<EmbeddingData>,
    expected: usize,
) -> Result<Vec<Vec<f32>>, RetrievalError> {
    if data.len() != expected {
        return Err(RetrievalError::CountMismatch {
            sent: expected,
            received: data.len(),
        });
    }
    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for item in data {
        match slots.get_mut(item.index) {
            Some(slot) if slot.is_none() => *slot = Some(item.embedding),
            _ => {
                return Err(RetrievalError::EmbeddingFailed {
                    reason: format!("Unexpected embedding index {}", item.index),
                });
            }
        }
    }
    // Every slot is filled: counts match and indices are unique and in range.
    Ok(slots.into_iter().flatten().collect())
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for (i, batch) in texts.chunks(self.batch_size).enumerate() {
            debug!(batch = i, size = batch.len(), model = %self.model, "Embedding batch");
            vectors.extend(self.embed_batch(batch).await?);
        }
        Ok(vectors)
    }
}
