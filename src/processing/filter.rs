//! File filtering rules applied during a walk.
//!
//! Exclusion is a path-component membership test: a file is skipped when any
//! component of its path relative to the working copy equals an excluded
//! directory name. The result does not depend on traversal order.

use std::collections::HashSet;
use std::path::{Component, Path};

use crate::{DEFAULT_MAX_FILE_SIZE, DEFAULT_OUTPUT_DIR_NAME};

/// Version-control metadata directories that are never ingested.
const VCS_DIRECTORIES: [&str; 3] = [".git", ".svn", ".hg"];

/// Bytes inspected when looking for binary content.
pub const BINARY_SAMPLE_SIZE: usize = 8192;

/// Configuration for file filtering.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Directory names excluded wherever they appear in a path.
    pub excluded_directories: HashSet<String>,
    /// Maximum file size in bytes.
    pub max_file_size: u64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::for_output_dir(DEFAULT_OUTPUT_DIR_NAME, DEFAULT_MAX_FILE_SIZE)
    }
}

impl FilterConfig {
    /// Exclude VCS metadata plus the pipeline's own output subdirectory.
    pub fn for_output_dir(output_dir_name: &str, max_file_size: u64) -> Self {
        let mut excluded_directories: HashSet<String> =
            VCS_DIRECTORIES.iter().map(|s| s.to_string()).collect();
        excluded_directories.insert(output_dir_name.to_string());
        Self {
            excluded_directories,
            max_file_size,
        }
    }
}

/// File filter for determining which paths to visit.
#[derive(Debug, Clone)]
pub struct FileFilter {
    config: FilterConfig,
}

impl FileFilter {
    /// Create a new file filter with the given configuration.
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    /// Create a filter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(FilterConfig::default())
    }

    /// Check whether a path relative to the working copy root is excluded.
    pub fn is_excluded(&self, relative: &Path) -> bool {
        self.excluded_component(relative).is_some()
    }

    /// The first excluded component of `relative`, if any.
    pub fn excluded_component<'a>(&self, relative: &'a Path) -> Option<&'a str> {
        relative.components().find_map(|component| match component {
            Component::Normal(name) => name
                .to_str()
                .filter(|name| self.config.excluded_directories.contains(*name)),
            _ => None,
        })
    }

    /// Check whether a file of `size` bytes may be read.
    pub fn within_size_limit(&self, size: u64) -> bool {
        size <= self.config.max_file_size
    }

    /// Check if content appears to be binary.
    pub fn is_binary_content(&self, content: &[u8]) -> bool {
        let sample = &content[..content.len().min(BINARY_SAMPLE_SIZE)];
        sample.contains(&0)
    }

    /// Get the configuration.
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vcs_directories_excluded() {
        let filter = FileFilter::with_defaults();

        assert!(filter.is_excluded(Path::new(".git/config")));
        assert!(filter.is_excluded(Path::new("vendor/lib/.git/hooks/pre-commit.py")));
        assert!(filter.is_excluded(Path::new(".hg/store/data.py")));
    }

    #[test]
    fn test_output_directory_excluded() {
        let filter = FileFilter::new(FilterConfig::for_output_dir("chunking", 1024));

        assert_eq!(
            filter.excluded_component(Path::new("chunking/python_chunks.json")),
            Some("chunking")
        );
        assert!(filter.is_excluded(Path::new("src/chunking/residue.py")));
    }

    #[test]
    fn test_component_match_is_exact() {
        let filter = FileFilter::with_defaults();

        assert!(!filter.is_excluded(Path::new("src/chunking_utils.py")));
        assert!(!filter.is_excluded(Path::new(".github/workflows/build.js")));
        assert!(!filter.is_excluded(Path::new("docs/.gitignore")));
        assert!(!filter.is_excluded(Path::new("app/main.py")));
    }

    #[test]
    fn test_size_limit() {
        let filter = FileFilter::new(FilterConfig::for_output_dir("out", 10));

        assert!(filter.within_size_limit(10));
        assert!(!filter.within_size_limit(11));
    }

    #[test]
    fn test_binary_detection() {
        let filter = FileFilter::with_defaults();

        assert!(!filter.is_binary_content(b"def foo():\n    return 1"));
        assert!(!filter.is_binary_content(b"// caf\xe9\n"));
        assert!(filter.is_binary_content(b"\x7fELF\x00\x01\x02"));
    }
}
