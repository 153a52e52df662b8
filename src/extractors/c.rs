//! C extractor.

use super::engine::{GrammarSpec, TreeSitterExtractor};
use crate::processing::Language;
use crate::types::ExtractionConfig;

pub static GRAMMAR: GrammarSpec = GrammarSpec {
    language: Language::C,
    grammar: tree_sitter_c::language,
    function_kinds: &["function_definition"],
    method_kinds: &[],
    class_kinds: &[],
    markup_kinds: &[],
};

pub fn extractor(config: ExtractionConfig) -> TreeSitterExtractor {
    TreeSitterExtractor::new(&GRAMMAR, config)
}
