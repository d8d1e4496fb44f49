//! Text embedding backends.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::EmbeddingError;
use crate::models::EmbeddingConfig;

/// Maps text to fixed-dimension vectors. Documents and queries go through
/// the same model so that their vectors are comparable.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of document texts, preserving order.
    async fn embed_documents(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed a single search query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_documents(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty embedding response".to_string()))
    }

    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;

    /// Returns the served model id when the backend reports one.
    async fn health_check(&self) -> Result<Option<String>, EmbeddingError>;
}

/// Request body for the /embed endpoint.
#[derive(Debug, Serialize)]
struct EmbedRequest {
    inputs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    truncate: Option<bool>,
}

/// Response from the /embed endpoint.
#[derive(Debug, Deserialize)]
struct EmbedResponse(Vec<Vec<f32>>);

/// Response from the /info endpoint.
#[derive(Debug, Deserialize)]
struct InfoResponse {
    #[serde(default)]
    model_id: Option<String>,
}

/// Client for a text-embeddings-inference style server.
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    client: Client,
    base_url: String,
    model: String,
    dimension: usize,
    batch_size: usize,
}

impl EmbeddingClient {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimension: config.dimension as usize,
            batch_size: config.batch_size.max(1) as usize,
        })
    }

    pub fn with_defaults() -> Result<Self, EmbeddingError> {
        Self::new(&EmbeddingConfig::default())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn embed_single_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/embed", self.base_url);
        let expected = texts.len();
        let request = EmbedRequest {
            inputs: texts,
            truncate: Some(true),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbeddingError::Timeout
                } else if e.is_connect() {
                    EmbeddingError::ConnectionError(e.to_string())
                } else {
                    EmbeddingError::RequestError(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ServerError(format!(
                "status {}: {}",
                status, body
            )));
        }

        let EmbedResponse(vectors) = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        if vectors.len() != expected {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                expected,
                vectors.len()
            )));
        }

        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed_documents(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            all_embeddings.extend(self.embed_single_batch(batch.to_vec()).await?);
        }
        Ok(all_embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<Option<String>, EmbeddingError> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(|e| EmbeddingError::ConnectionError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EmbeddingError::ServerError(format!(
                "health check failed with status: {}",
                response.status()
            )));
        }

        // /info is optional; older servers only expose /health
        let model_id = match self
            .client
            .get(format!("{}/info", self.base_url))
            .send()
            .await
        {
            Ok(info) if info.status().is_success() => info
                .json::<InfoResponse>()
                .await
                .ok()
                .and_then(|i| i.model_id),
            _ => None,
        };

        Ok(model_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = EmbeddingClient::with_defaults().unwrap();
        assert_eq!(client.dimension(), 768);
        assert_eq!(client.model_name(), "sentence-transformers/all-mpnet-base-v2");
    }

    #[test]
    fn test_base_url_trimming() {
        let config = EmbeddingConfig {
            url: "http://localhost:8080/".to_string(),
            ..Default::default()
        };
        let client = EmbeddingClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_embed_request_shape() {
        let request = EmbedRequest {
            inputs: vec!["Formula: Si".to_string()],
            truncate: Some(true),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["inputs"][0], "Formula: Si");
        assert_eq!(json["truncate"], true);
    }
}
