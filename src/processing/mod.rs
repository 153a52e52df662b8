//! Processing module for file classification and reading.
//!
//! This module provides:
//! - Language detection from file extensions
//! - Path exclusion and size/binary screening
//! - Encoding fallback when reading source files

pub mod file_processor;
pub mod filter;
pub mod language;

pub use file_processor::{DecodedSource, FileProcessor, SourceEncoding};
pub use filter::{FileFilter, FilterConfig};
pub use language::{Language, LanguageDetector};
