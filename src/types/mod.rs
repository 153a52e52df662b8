//! Core types for the ingestion pipeline.

mod chunk;
mod config;
mod repository;

pub use chunk::{ChunkKind, CodeChunk};
pub use config::{ExtractionConfig, IngestConfig};
pub use repository::{FileRecord, RepositoryReference, WorkingCopy};
