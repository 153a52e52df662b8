//! Output module for sending chunks to downstream services.

mod embedding_client;
mod manifest;
mod sink;

pub use embedding_client::EmbeddingClient;
pub use manifest::ChunkManifest;
pub use sink::{ChunkSink, MemorySink};
