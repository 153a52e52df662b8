//! Chunk sink contract.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::SinkError;

/// Downstream consumer of extracted chunks.
///
/// The walker calls `store` once per file that produced chunks. Failures are
/// logged by the caller and never stop the walk.
#[async_trait]
pub trait ChunkSink: Send + Sync {
    async fn store(&self, chunks: &[String], project_id: &str) -> Result<(), SinkError>;
}

/// Sink that keeps every batch in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    batches: Mutex<Vec<(String, Vec<String>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every batch received, in arrival order, with its project id.
    pub fn batches(&self) -> Vec<(String, Vec<String>)> {
        self.batches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// All chunks received, flattened.
    pub fn chunks(&self) -> Vec<String> {
        self.batches().into_iter().flat_map(|(_, chunks)| chunks).collect()
    }
}

#[async_trait]
impl ChunkSink for MemorySink {
    async fn store(&self, chunks: &[String], project_id: &str) -> Result<(), SinkError> {
        self.batches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((project_id.to_string(), chunks.to_vec()));
        Ok(())
    }
}
