//! Repository Ingestion Library
//!
//! Fetches a remote source repository, walks its working copy and extracts
//! function-level code chunks with tree-sitter for Python, Java, JavaScript,
//! C and C++. Chunks are handed to a [`ChunkSink`] as they are produced and
//! the working copy is removed when the run ends.

pub mod api;
pub mod error;
pub mod extractors;
pub mod output;
pub mod pipeline;
pub mod processing;
pub mod repository;
pub mod types;

pub use error::{CleanupError, DecodeError, ExtractionError, FetchError, FileError, SinkError, WalkError};
pub use extractors::{Extractor, ExtractorRegistry};
pub use output::{ChunkSink, EmbeddingClient, MemorySink};
pub use pipeline::{IngestionPipeline, TreeWalker, WalkSummary};
pub use processing::{Language, LanguageDetector};
pub use repository::{GitLabProvider, RepositoryFetcher, SourceControl, WorkspaceCleaner};
pub use types::{CodeChunk, IngestConfig, RepositoryReference, WorkingCopy};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::*;
    pub use crate::extractors::{Extractor, ExtractorRegistry};
    pub use crate::output::{ChunkSink, MemorySink};
    pub use crate::pipeline::*;
    pub use crate::processing::{Language, LanguageDetector};
    pub use crate::repository::{RepositoryFetcher, SourceControl, WorkspaceCleaner};
    pub use crate::types::*;
}

/// Default name of the pipeline output subdirectory
pub const DEFAULT_OUTPUT_DIR_NAME: &str = "chunking";

/// Default maximum source file size (1MB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Default maximum syntax nodes visited per file
pub const DEFAULT_MAX_TREE_NODES: usize = 1_000_000;

/// Default maximum syntax tree depth visited per file
pub const DEFAULT_MAX_TREE_DEPTH: usize = 2048;
