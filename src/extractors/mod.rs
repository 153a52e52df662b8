//! Language-specific code unit extraction.
//!
//! Every supported language has one module exposing a tree-sitter
//! [`GrammarSpec`](engine::GrammarSpec). The [`ExtractorRegistry`] is built
//! once per pipeline and resolves an extractor by [`Language`], so callers
//! never branch on the language themselves.

mod base;
pub mod c;
pub mod cpp;
pub mod engine;
pub mod java;
pub mod javascript;
pub mod python;

use std::collections::HashMap;

use tracing::{debug, warn};

pub use base::{guarded_extract, ExtractedUnit, Extractor};
pub use engine::{GrammarSpec, TreeSitterExtractor};

use crate::error::ExtractionError;
use crate::processing::Language;
use crate::types::ExtractionConfig;

/// Table of extractors keyed by language.
pub struct ExtractorRegistry {
    extractors: HashMap<Language, Box<dyn Extractor>>,
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new(ExtractionConfig::default())
    }
}

impl ExtractorRegistry {
    /// Create a registry with every built-in extractor whose grammar loads.
    pub fn new(config: ExtractionConfig) -> Self {
        let mut registry = Self::empty();

        for language in Language::ALL {
            let extractor = builtin(language, config);
            match extractor.verify_grammar() {
                Ok(()) => {
                    registry.register(Box::new(extractor));
                    debug!(language = %language, "Loaded tree-sitter grammar");
                }
                Err(e) => warn!(language = %language, error = %e, "Skipping extractor"),
            }
        }

        registry
    }

    /// Create a registry with no extractors.
    pub fn empty() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    /// Register an extractor, replacing any previous one for its language.
    pub fn register(&mut self, extractor: Box<dyn Extractor>) {
        self.extractors.insert(extractor.language(), extractor);
    }

    /// Get the extractor for a language.
    pub fn get(&self, language: Language) -> Option<&dyn Extractor> {
        self.extractors.get(&language).map(|e| e.as_ref())
    }

    /// Check if a language has an extractor.
    pub fn supports(&self, language: Language) -> bool {
        self.extractors.contains_key(&language)
    }

    /// Extract units from `source`, containing panics.
    pub fn extract(
        &self,
        language: Language,
        source: &str,
    ) -> Result<Vec<ExtractedUnit>, ExtractionError> {
        let extractor = self
            .get(language)
            .ok_or_else(|| ExtractionError::UnsupportedLanguage(language.to_string()))?;
        guarded_extract(extractor, source)
    }
}

fn builtin(language: Language, config: ExtractionConfig) -> TreeSitterExtractor {
    match language {
        Language::Python => python::extractor(config),
        Language::Java => java::extractor(config),
        Language::JavaScript => javascript::extractor(config),
        Language::C => c::extractor(config),
        Language::Cpp => cpp::extractor(config),
    }
}
