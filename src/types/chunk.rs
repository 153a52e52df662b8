//! Chunk type definitions.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::processing::Language;

/// Syntactic category of an extracted unit, when the grammar tells them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Function,
    Method,
    Class,
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkKind::Function => "function",
            ChunkKind::Method => "method",
            ChunkKind::Class => "class",
        }
    }
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chunk of source extracted from one file of a working copy.
///
/// Chunks are value objects: the text is a verbatim slice of the decoded file
/// content and carries its provenance. A chunk may lie entirely inside another
/// chunk from the same file (an inner function inside a method).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeChunk {
    /// The exact source text of the unit
    pub content: String,

    /// File the chunk came from
    pub path: PathBuf,

    /// Language the file was parsed as
    pub language: Language,

    /// Function, method or class, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ChunkKind>,

    /// Byte offsets `[start, end)` in the decoded content
    pub byte_range: (usize, usize),

    /// Line numbers in the original file (1-indexed, inclusive)
    pub line_range: (usize, usize),
}

impl CodeChunk {
    /// Path of the originating file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the length of the chunk content in bytes.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Check if the chunk is empty.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ChunkKind::Method).unwrap();
        assert_eq!(json, "\"method\"");
        assert_eq!(ChunkKind::Class.to_string(), "class");
    }

    #[test]
    fn test_chunk_without_kind_omits_field() {
        let chunk = CodeChunk {
            content: "def foo(): pass".to_string(),
            path: PathBuf::from("a.py"),
            language: Language::Python,
            kind: None,
            byte_range: (0, 15),
            line_range: (1, 1),
        };
        let value = serde_json::to_value(&chunk).unwrap();
        assert!(value.get("kind").is_none());
        assert_eq!(value["language"], "python");
        assert_eq!(chunk.len(), 15);
    }
}
