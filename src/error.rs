//! Error types for repository ingestion.
//!
//! Each stage of a run has its own error type so callers can decide how far a
//! failure reaches: a file, the walk, or the whole run.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failures while obtaining a working copy. These abort the run.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The provider or the git transport rejected the credentials.
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// The provider or the remote could not be reached.
    #[error("network unreachable: {0}")]
    Network(String),

    /// The project does not exist or is not visible with this token.
    #[error("remote project not found: {0}")]
    NotFound(String),

    #[error("invalid repository url: {0}")]
    InvalidUrl(String),

    /// The project id cannot name a directory under the clone root.
    #[error("invalid project id: {0:?}")]
    InvalidProjectId(String),

    /// The provider answered with something we could not use.
    #[error("provider error: {0}")]
    Provider(String),

    /// The clone failed after the target directory was prepared.
    #[error("clone into {} failed: {source}", path.display())]
    Clone {
        path: PathBuf,
        #[source]
        source: Box<FetchError>,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Directory left behind by a failed clone, if any.
    pub fn residue(&self) -> Option<&Path> {
        match self {
            FetchError::Clone { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Failures while reading a source file into text.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("binary content detected")]
    Binary,

    #[error("file too large: {size} bytes (max: {max})")]
    TooLarge { size: u64, max: u64 },
}

/// Failures inside an extractor. Always scoped to one file.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("no extractor registered for {0}")]
    UnsupportedLanguage(String),

    #[error("grammar rejected by parser: {0}")]
    Grammar(String),

    #[error("parser produced no tree")]
    ParseFailed,

    #[error("syntax error at line {line}, column {column}")]
    Syntax { line: usize, column: usize },

    #[error("node span {start}..{end} is not a valid slice of the source")]
    InvalidSpan { start: usize, end: usize },

    #[error("syntax tree exceeds {limit} nodes")]
    TooManyNodes { limit: usize },

    #[error("syntax tree deeper than {limit} levels")]
    TooDeep { limit: usize },

    #[error("extractor panicked: {0}")]
    Panicked(String),
}

/// Per-file failure, as seen by the walker.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
}

/// Failures reported by a chunk sink. Logged, never fatal to the walk.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sink rejected batch: {0}")]
    Rejected(String),
}

/// Failures while removing a working copy. Logged, never propagated.
#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("gave up removing {} after {attempts} attempts", path.display())]
    Exhausted { path: PathBuf, attempts: u32 },
}

/// Failures that stop a walk before it reaches every file.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("working copy root {} is not readable: {source}", path.display())]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write manifest: {0}")]
    Manifest(#[from] std::io::Error),

    #[error("could not serialize manifest: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_error_reports_residue() {
        let err = FetchError::Clone {
            path: PathBuf::from("/tmp/clone/project"),
            source: Box::new(FetchError::Network("early EOF".to_string())),
        };
        assert_eq!(err.residue(), Some(Path::new("/tmp/clone/project")));
        assert!(err.to_string().contains("early EOF"));
        assert!(FetchError::NotFound("42".into()).residue().is_none());
    }

    #[test]
    fn test_file_error_wraps_kinds() {
        let err: FileError = ExtractionError::TooManyNodes { limit: 10 }.into();
        assert!(matches!(err, FileError::Extraction(_)));
        assert!(err.to_string().contains("10 nodes"));
    }
}
