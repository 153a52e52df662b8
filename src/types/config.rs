//! Configuration types for ingestion runs.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::repository::RetryPolicy;
use crate::{
    DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_TREE_DEPTH, DEFAULT_MAX_TREE_NODES,
    DEFAULT_OUTPUT_DIR_NAME,
};

/// Global ingestion service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Directory under which every project gets its own local path
    pub clone_root: PathBuf,

    /// Name of the pipeline output subdirectory inside a working copy
    pub output_dir_name: String,

    /// Write per-language chunk manifests into the output subdirectory
    pub write_manifest: bool,

    /// Relocate the output subdirectory out of the working copy on cleanup
    pub preserve_output: bool,

    /// Files larger than this are skipped (bytes)
    pub max_file_size: u64,

    /// Syntax tree limits applied by every extractor
    pub extraction: ExtractionConfig,

    /// Delay before removing a working copy (milliseconds)
    pub cleanup_settle_ms: u64,

    /// Attempts made to remove a working copy
    pub cleanup_max_attempts: u32,

    /// Initial backoff between removal attempts (milliseconds)
    pub cleanup_backoff_ms: u64,

    /// URL of the embedding service
    pub embedding_service_url: String,

    /// Timeout for one sink request (seconds)
    pub sink_timeout_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            clone_root: PathBuf::from("./cloneRepo"),
            output_dir_name: DEFAULT_OUTPUT_DIR_NAME.to_string(),
            write_manifest: false,
            preserve_output: true,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            extraction: ExtractionConfig::default(),
            cleanup_settle_ms: 1000,
            cleanup_max_attempts: 3,
            cleanup_backoff_ms: 200,
            embedding_service_url: "http://localhost:3018".to_string(),
            sink_timeout_secs: 30,
        }
    }
}

impl IngestConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            clone_root: std::env::var("CLONE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.clone_root),
            output_dir_name: std::env::var("OUTPUT_DIR_NAME")
                .unwrap_or(defaults.output_dir_name),
            write_manifest: env_flag("WRITE_MANIFEST").unwrap_or(defaults.write_manifest),
            preserve_output: env_flag("PRESERVE_OUTPUT").unwrap_or(defaults.preserve_output),
            max_file_size: env_parse("MAX_FILE_SIZE").unwrap_or(defaults.max_file_size),
            extraction: ExtractionConfig {
                max_nodes: env_parse("MAX_TREE_NODES").unwrap_or(DEFAULT_MAX_TREE_NODES),
                max_depth: env_parse("MAX_TREE_DEPTH").unwrap_or(DEFAULT_MAX_TREE_DEPTH),
                include_classes: env_flag("INCLUDE_CLASSES").unwrap_or(false),
            },
            cleanup_settle_ms: env_parse("CLEANUP_SETTLE_MS").unwrap_or(defaults.cleanup_settle_ms),
            cleanup_max_attempts: env_parse("CLEANUP_MAX_ATTEMPTS")
                .unwrap_or(defaults.cleanup_max_attempts),
            cleanup_backoff_ms: env_parse("CLEANUP_BACKOFF_MS")
                .unwrap_or(defaults.cleanup_backoff_ms),
            embedding_service_url: std::env::var("EMBEDDING_SERVICE_URL")
                .unwrap_or(defaults.embedding_service_url),
            sink_timeout_secs: env_parse("SINK_TIMEOUT_SECS").unwrap_or(defaults.sink_timeout_secs),
        }
    }

    /// Delay before the cleaner touches the filesystem.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.cleanup_settle_ms)
    }

    /// Removal retry policy built from the cleanup settings.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.cleanup_max_attempts.max(1),
            initial_backoff: Duration::from_millis(self.cleanup_backoff_ms),
            ..RetryPolicy::default()
        }
    }
}

/// Limits and options shared by every extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Maximum syntax nodes visited per file
    pub max_nodes: usize,

    /// Maximum nesting depth visited per file
    pub max_depth: usize,

    /// Emit class-like units alongside function-like ones
    pub include_classes: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_nodes: DEFAULT_MAX_TREE_NODES,
            max_depth: DEFAULT_MAX_TREE_DEPTH,
            include_classes: false,
        }
    }
}

impl ExtractionConfig {
    /// Set whether class-like units are emitted.
    pub fn with_classes(mut self, include: bool) -> Self {
        self.include_classes = include;
        self
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}
