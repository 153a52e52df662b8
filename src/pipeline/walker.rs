//! Working-copy traversal and per-file extraction.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{DecodeError, FileError, WalkError};
use crate::extractors::ExtractorRegistry;
use crate::output::{ChunkManifest, ChunkSink};
use crate::processing::{FileProcessor, FilterConfig, LanguageDetector};
use crate::types::{CodeChunk, FileRecord, IngestConfig, WorkingCopy};

/// Counters for one walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSummary {
    /// Files reached after exclusion rules
    pub files_visited: usize,
    /// Files with no supported language, or screened out as binary or too large
    pub files_skipped: usize,
    /// Files that could not be read or whose extractor failed
    pub files_failed: usize,
    pub chunks: usize,
    pub sink_failures: usize,
}

/// Walks a working copy and forwards chunks to a sink.
pub struct TreeWalker {
    detector: LanguageDetector,
    extraction: Arc<FileExtraction>,
    output_dir_name: String,
    write_manifest: bool,
}

/// Reading and parsing of single files. Shared with blocking tasks.
struct FileExtraction {
    processor: FileProcessor,
    registry: ExtractorRegistry,
}

impl FileExtraction {
    fn process(&self, record: &FileRecord) -> Result<Vec<CodeChunk>, FileError> {
        let Some(language) = record.language else {
            return Ok(Vec::new());
        };

        let source = self.processor.read(&record.path)?;
        debug!(
            path = %record.relative.display(),
            encoding = source.encoding.as_str(),
            "Decoded file"
        );

        let units = self.registry.extract(language, &source.text)?;
        Ok(units
            .into_iter()
            .map(|unit| CodeChunk {
                content: unit.text,
                path: record.path.clone(),
                language,
                kind: unit.kind,
                byte_range: unit.byte_range,
                line_range: unit.line_range,
            })
            .collect())
    }
}

impl TreeWalker {
    pub fn new(config: &IngestConfig) -> Self {
        Self::with_registry(config, ExtractorRegistry::new(config.extraction))
    }

    /// Create a walker using the given extractors.
    pub fn with_registry(config: &IngestConfig, registry: ExtractorRegistry) -> Self {
        let filter_config = FilterConfig::for_output_dir(&config.output_dir_name, config.max_file_size);
        Self {
            detector: LanguageDetector::new(),
            extraction: Arc::new(FileExtraction {
                processor: FileProcessor::new(filter_config),
                registry,
            }),
            output_dir_name: config.output_dir_name.clone(),
            write_manifest: config.write_manifest,
        }
    }

    /// Enumerate every non-excluded regular file under `root`, depth first.
    ///
    /// Unreadable subdirectories are logged and skipped.
    pub fn records(&self, root: &Path) -> Result<Vec<FileRecord>, WalkError> {
        fs::read_dir(root).map_err(|source| WalkError::Root {
            path: root.to_path_buf(),
            source,
        })?;

        let filter = self.extraction.processor.filter();
        let mut records = Vec::new();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
                !filter.is_excluded(relative)
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.into_path();
            let relative = path
                .strip_prefix(root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| path.clone());
            let language = self.detector.detect(&path);
            records.push(FileRecord {
                path,
                relative,
                language,
            });
        }

        Ok(records)
    }

    /// Read one file and extract its chunks.
    ///
    /// A record without a language yields no chunks.
    pub fn process_file(&self, record: &FileRecord) -> Result<Vec<CodeChunk>, FileError> {
        self.extraction.process(record)
    }

    /// Run `process_file` on the blocking pool.
    async fn process_file_blocking(&self, record: &FileRecord) -> Option<Result<Vec<CodeChunk>, FileError>> {
        let extraction = Arc::clone(&self.extraction);
        let task_record = record.clone();
        let span = tracing::Span::current();
        let task = move || span.in_scope(|| extraction.process(&task_record));
        match tokio::task::spawn_blocking(task).await {
            Ok(result) => Some(result),
            Err(e) => {
                warn!(path = %record.relative.display(), error = %e, "Extraction task failed");
                None
            }
        }
    }

    /// Walk `working_copy`, sending each file's chunks to `sink` as soon as
    /// they are extracted.
    pub async fn walk(
        &self,
        working_copy: &WorkingCopy,
        project_id: &str,
        sink: &dyn ChunkSink,
    ) -> Result<WalkSummary, WalkError> {
        let root = working_copy.root();
        let records = self.records(root)?;
        let mut summary = WalkSummary::default();
        let mut manifest = self.write_manifest.then(ChunkManifest::new);

        for record in &records {
            summary.files_visited += 1;
            if record.language.is_none() {
                summary.files_skipped += 1;
                continue;
            }

            let Some(processed) = self.process_file_blocking(record).await else {
                summary.files_failed += 1;
                continue;
            };
            let chunks = match processed {
                Ok(chunks) => chunks,
                Err(FileError::Decode(e @ (DecodeError::Binary | DecodeError::TooLarge { .. }))) => {
                    debug!(path = %record.relative.display(), reason = %e, "Skipping file");
                    summary.files_skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!(
                        path = %record.relative.display(),
                        language = record.language_tag(),
                        error = %e,
                        "Failed to process file"
                    );
                    summary.files_failed += 1;
                    continue;
                }
            };

            if chunks.is_empty() {
                continue;
            }
            summary.chunks += chunks.len();
            debug!(
                path = %record.relative.display(),
                language = record.language_tag(),
                chunks = chunks.len(),
                "Extracted chunks"
            );

            let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
            if let Err(e) = sink.store(&texts, project_id).await {
                warn!(path = %record.relative.display(), error = %e, "Sink rejected chunks");
                summary.sink_failures += 1;
            }

            if let Some(manifest) = manifest.as_mut() {
                manifest.record(&record.relative, &chunks);
            }
        }

        if let Some(manifest) = manifest.filter(|m| !m.is_empty()) {
            let written = manifest.write_to(&self.output_dir(root))?;
            info!(files = written.len(), "Wrote chunk manifests");
        }

        Ok(summary)
    }

    /// Output subdirectory inside `root`.
    pub fn output_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.output_dir_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use crate::error::SinkError;
    use crate::output::MemorySink;
    use crate::processing::Language;

    struct FailingSink;

    #[async_trait]
    impl ChunkSink for FailingSink {
        async fn store(&self, _chunks: &[String], _project_id: &str) -> Result<(), SinkError> {
            Err(SinkError::Rejected("storage offline".to_string()))
        }
    }

    fn tree(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (relative, content) in files {
            let path = dir.path().join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        dir
    }

    fn working_copy(dir: &tempfile::TempDir) -> WorkingCopy {
        WorkingCopy::new(dir.path().to_path_buf(), dir.path().to_path_buf(), false)
    }

    #[test]
    fn test_records_skip_vcs_and_output_dirs() {
        let dir = tree(&[
            ("src/a.py", "def a(): pass\n"),
            (".git/hooks/pre-commit.py", "def hook(): pass\n"),
            ("chunking/python_chunks.json", "{}"),
            ("nested/chunking/b.py", "def b(): pass\n"),
            ("README.md", "# readme"),
        ]);
        let walker = TreeWalker::new(&IngestConfig::default());

        let relative: Vec<PathBuf> = walker
            .records(dir.path())
            .unwrap()
            .into_iter()
            .map(|r| r.relative)
            .collect();

        assert_eq!(
            relative,
            vec![PathBuf::from("README.md"), PathBuf::from("src/a.py")]
        );
    }

    #[test]
    fn test_missing_root_is_walk_error() {
        let dir = tempfile::tempdir().unwrap();
        let walker = TreeWalker::new(&IngestConfig::default());

        let result = walker.records(&dir.path().join("missing"));
        assert!(matches!(result, Err(WalkError::Root { .. })));
    }

    #[test]
    fn test_process_file_carries_provenance() {
        let dir = tree(&[("lib/util.py", "x = 1\n\ndef helper(a):\n    return a\n")]);
        let walker = TreeWalker::new(&IngestConfig::default());
        let record = FileRecord {
            path: dir.path().join("lib/util.py"),
            relative: PathBuf::from("lib/util.py"),
            language: Some(Language::Python),
        };

        let chunks = walker.process_file(&record).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "def helper(a):\n    return a");
        assert_eq!(chunks[0].line_range, (3, 4));
        assert_eq!(chunks[0].path(), record.path.as_path());
    }

    #[tokio::test]
    async fn test_walk_forwards_one_batch_per_file() {
        let dir = tree(&[
            ("a.py", "def foo():\n    return 1"),
            ("b.c", "int add(int x, int y) { return x + y; }\n"),
            ("c.py", "x = 1\n"),
        ]);
        let sink = MemorySink::new();

        let summary = TreeWalker::new(&IngestConfig::default())
            .walk(&working_copy(&dir), "7", &sink)
            .await
            .unwrap();

        assert_eq!(summary.files_visited, 3);
        assert_eq!(summary.chunks, 2);
        let batches = sink.batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0], ("7".to_string(), vec!["def foo():\n    return 1".to_string()]));
    }

    #[tokio::test]
    async fn test_bad_files_do_not_stop_the_walk() {
        let dir = tree(&[
            ("a_broken.py", "def broken(:\n"),
            ("b_binary.js", "function f() {}\0\0"),
            ("c_good.java", "class A { void run() { } }\n"),
        ]);
        let sink = MemorySink::new();

        let summary = TreeWalker::new(&IngestConfig::default())
            .walk(&working_copy(&dir), "7", &sink)
            .await
            .unwrap();

        assert_eq!(summary.files_skipped, 1);
        assert_eq!(summary.chunks, 1);
        assert_eq!(sink.chunks(), vec!["void run() { }"]);
    }

    #[tokio::test]
    async fn test_walk_leaves_runtime_free_for_other_tasks() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let files: Vec<(String, String)> = (0..20)
            .map(|i| (format!("m{:02}.py", i), format!("def f{}():\n    return {}\n", i, i)))
            .collect();
        let borrowed: Vec<(&str, &str)> = files.iter().map(|(p, c)| (p.as_str(), c.as_str())).collect();
        let dir = tree(&borrowed);

        let ticks = Arc::new(AtomicUsize::new(0));
        let ticker = {
            let ticks = ticks.clone();
            tokio::spawn(async move {
                loop {
                    ticks.fetch_add(1, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                }
            })
        };

        let summary = TreeWalker::new(&IngestConfig::default())
            .walk(&working_copy(&dir), "7", &MemorySink::new())
            .await
            .unwrap();
        let observed = ticks.load(Ordering::SeqCst);
        ticker.abort();

        assert_eq!(summary.chunks, 20);
        assert!(observed > 0, "walk never yielded to the runtime");
    }

    #[tokio::test]
    async fn test_sink_failures_are_counted_not_fatal() {
        let dir = tree(&[
            ("a.py", "def a():\n    return 1\n"),
            ("b.py", "def b():\n    return 2\n"),
        ]);

        let summary = TreeWalker::new(&IngestConfig::default())
            .walk(&working_copy(&dir), "7", &FailingSink)
            .await
            .unwrap();

        assert_eq!(summary.chunks, 2);
        assert_eq!(summary.sink_failures, 2);
    }

    #[tokio::test]
    async fn test_manifest_written_when_enabled() {
        let dir = tree(&[("pkg/a.py", "def a():\n    return 1\n")]);
        let config = IngestConfig {
            write_manifest: true,
            ..Default::default()
        };

        TreeWalker::new(&config)
            .walk(&working_copy(&dir), "7", &MemorySink::new())
            .await
            .unwrap();

        let manifest = fs::read_to_string(dir.path().join("chunking/python_chunks.json")).unwrap();
        assert!(manifest.contains("pkg/a.py"));
        assert!(!dir.path().join("chunking/java_chunks.json").exists());
    }
}
