//! Base trait for all extractors.

use std::panic::{self, AssertUnwindSafe};

use tracing::debug;

use crate::error::ExtractionError;
use crate::processing::Language;
use crate::types::ChunkKind;

/// One function-like or class-like unit found in a source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedUnit {
    /// Verbatim text of `source[byte_range.0..byte_range.1]`
    pub text: String,
    /// `None` for units the grammar does not classify (embedded markup)
    pub kind: Option<ChunkKind>,
    pub byte_range: (usize, usize),
    /// 1-indexed, inclusive
    pub line_range: (usize, usize),
}

/// The core trait that every language extractor implements.
///
/// An extractor turns source text into the ordered list of code units it
/// contains. Units are returned in document (pre-order) order and are never
/// merged: an inner function appears on its own and inside its parent's text.
pub trait Extractor: Send + Sync {
    /// Language this extractor parses.
    fn language(&self) -> Language;

    /// Extract units, reporting why extraction failed.
    fn try_extract(&self, source: &str) -> Result<Vec<ExtractedUnit>, ExtractionError>;

    /// Extract unit texts, failing closed.
    ///
    /// Any failure, including a panic inside the parser glue, yields an
    /// empty list.
    fn extract(&self, source: &str) -> Vec<String> {
        match guarded_extract(self, source) {
            Ok(units) => units.into_iter().map(|unit| unit.text).collect(),
            Err(e) => {
                debug!(language = %self.language(), error = %e, "Extraction failed closed");
                Vec::new()
            }
        }
    }
}

/// Run `try_extract`, converting a panic into `ExtractionError::Panicked`.
pub fn guarded_extract<E: Extractor + ?Sized>(
    extractor: &E,
    source: &str,
) -> Result<Vec<ExtractedUnit>, ExtractionError> {
    panic::catch_unwind(AssertUnwindSafe(|| extractor.try_extract(source))).unwrap_or_else(
        |payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(ExtractionError::Panicked(message))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Exploding;

    impl Extractor for Exploding {
        fn language(&self) -> Language {
            Language::C
        }

        fn try_extract(&self, _source: &str) -> Result<Vec<ExtractedUnit>, ExtractionError> {
            panic!("grammar blew up")
        }
    }

    #[test]
    fn test_panic_is_contained() {
        let result = guarded_extract(&Exploding, "int main() {}");
        match result {
            Err(ExtractionError::Panicked(message)) => assert!(message.contains("blew up")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_extract_fails_closed_on_panic() {
        assert!(Exploding.extract("int main() {}").is_empty());
    }
}
