//! Python extractor.

use super::engine::{GrammarSpec, TreeSitterExtractor};
use crate::processing::Language;
use crate::types::ExtractionConfig;

pub static GRAMMAR: GrammarSpec = GrammarSpec {
    language: Language::Python,
    grammar: tree_sitter_python::language,
    function_kinds: &["function_definition", "lambda"],
    method_kinds: &[],
    class_kinds: &["class_definition"],
    markup_kinds: &[],
};

pub fn extractor(config: ExtractionConfig) -> TreeSitterExtractor {
    TreeSitterExtractor::new(&GRAMMAR, config)
}
