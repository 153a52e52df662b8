//! Per-language chunk manifests written into the output subdirectory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::WalkError;
use crate::processing::Language;
use crate::types::CodeChunk;

/// Chunks grouped by language, then by path relative to the working copy.
#[derive(Debug, Default)]
pub struct ChunkManifest {
    entries: BTreeMap<Language, BTreeMap<String, Vec<String>>>,
}

impl ChunkManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record chunks extracted from `relative`.
    pub fn record(&mut self, relative: &Path, chunks: &[CodeChunk]) {
        for chunk in chunks {
            self.entries
                .entry(chunk.language)
                .or_default()
                .entry(relative.to_string_lossy().into_owned())
                .or_default()
                .push(chunk.content.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn languages(&self) -> impl Iterator<Item = Language> + '_ {
        self.entries.keys().copied()
    }

    /// Write `<language>_chunks.json` for every language seen into `dir`.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>, WalkError> {
        fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(self.entries.len());
        for (language, files) in &self.entries {
            let path = dir.join(format!("{}_chunks.json", language.as_str()));
            fs::write(&path, serde_json::to_vec_pretty(files)?)?;
            debug!(path = %path.display(), files = files.len(), "Wrote manifest");
            written.push(path);
        }
        Ok(written)
    }
}
