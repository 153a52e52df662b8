//! HTTP client for sending chunks to the embedding service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::sink::ChunkSink;
use crate::error::SinkError;

/// Client for sending chunks to the embedding service.
pub struct EmbeddingClient {
    client: Client,
    base_url: String,
    batch_size: usize,
}

/// Request payload for embedding chunks.
#[derive(Debug, Serialize)]
struct EmbedChunksRequest<'a> {
    collection: String,
    project_id: &'a str,
    texts: &'a [String],
}

/// Response from embedding service.
#[derive(Debug, Deserialize)]
struct EmbedChunksResponse {
    embedded_count: usize,
    #[serde(default)]
    errors: Vec<String>,
}

impl EmbeddingClient {
    /// Create a new embedding client.
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
            batch_size: 50,
        }
    }

    /// Set the batch size for sending chunks.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Collection the service stores a project's vectors in.
    pub fn collection_for(project_id: &str) -> String {
        format!("code_embeddings_{}", project_id)
    }

    /// Send a single batch of chunks.
    async fn send_batch(&self, texts: &[String], project_id: &str) -> Result<usize, SinkError> {
        let request = EmbedChunksRequest {
            collection: Self::collection_for(project_id),
            project_id,
            texts,
        };

        let url = format!("{}/embed/chunks", self.base_url);

        let response = self.client.post(&url).json(&request).send().await?;

        if response.status().is_success() {
            let result: EmbedChunksResponse = response.json().await?;
            for error in &result.errors {
                error!(error, "Embedding service reported error");
            }
            Ok(result.embedded_count)
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(SinkError::Rejected(format!(
                "embedding service returned {}: {}",
                status, text
            )))
        }
    }

    /// Check if the embedding service is healthy.
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl ChunkSink for EmbeddingClient {
    async fn store(&self, chunks: &[String], project_id: &str) -> Result<(), SinkError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let mut total_embedded = 0;
        for batch in chunks.chunks(self.batch_size) {
            let count = self.send_batch(batch, project_id).await?;
            total_embedded += count;
            debug!(batch_size = batch.len(), embedded = count, "Batch sent");
        }

        info!(project_id, total_embedded, "Chunks sent to embedding service");
        Ok(())
    }
}
