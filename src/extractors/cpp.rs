//! C++ extractor.

use super::engine::{GrammarSpec, TreeSitterExtractor};
use crate::processing::Language;
use crate::types::ExtractionConfig;

pub static GRAMMAR: GrammarSpec = GrammarSpec {
    language: Language::Cpp,
    grammar: tree_sitter_cpp::language,
    function_kinds: &["function_definition", "lambda_expression"],
    method_kinds: &[],
    class_kinds: &["class_specifier", "struct_specifier"],
    markup_kinds: &[],
};

pub fn extractor(config: ExtractionConfig) -> TreeSitterExtractor {
    TreeSitterExtractor::new(&GRAMMAR, config)
}
