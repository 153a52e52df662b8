//! Reading source files into text.
//!
//! UTF-8 is tried first; content that is not valid UTF-8 is decoded as
//! Latin-1, which maps every byte to a code point and never fails.

use std::fs;
use std::path::Path;

use crate::error::DecodeError;
use crate::processing::filter::{FileFilter, FilterConfig};

/// Encoding a file was decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    Utf8,
    Latin1,
}

impl SourceEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceEncoding::Utf8 => "utf-8",
            SourceEncoding::Latin1 => "latin-1",
        }
    }
}

/// Decoded file content.
#[derive(Debug, Clone)]
pub struct DecodedSource {
    pub text: String,
    pub encoding: SourceEncoding,
}

/// File reader with size and binary screening.
pub struct FileProcessor {
    filter: FileFilter,
}

impl Default for FileProcessor {
    fn default() -> Self {
        Self::new(FilterConfig::default())
    }
}

impl FileProcessor {
    /// Create a new file processor with the given configuration.
    pub fn new(config: FilterConfig) -> Self {
        Self {
            filter: FileFilter::new(config),
        }
    }

    /// Read and decode the file at `path`.
    pub fn read(&self, path: &Path) -> Result<DecodedSource, DecodeError> {
        let size = fs::metadata(path)?.len();
        if !self.filter.within_size_limit(size) {
            return Err(DecodeError::TooLarge {
                size,
                max: self.filter.config().max_file_size,
            });
        }

        let content = fs::read(path)?;
        self.decode(content)
    }

    /// Decode raw bytes, falling back to Latin-1.
    pub fn decode(&self, content: Vec<u8>) -> Result<DecodedSource, DecodeError> {
        if self.filter.is_binary_content(&content) {
            return Err(DecodeError::Binary);
        }

        match String::from_utf8(content) {
            Ok(text) => Ok(DecodedSource {
                text,
                encoding: SourceEncoding::Utf8,
            }),
            Err(e) => Ok(DecodedSource {
                text: decode_latin1(e.as_bytes()),
                encoding: SourceEncoding::Latin1,
            }),
        }
    }

    /// Get the underlying filter.
    pub fn filter(&self) -> &FileFilter {
        &self.filter
    }
}

/// Decode bytes as ISO-8859-1.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}
