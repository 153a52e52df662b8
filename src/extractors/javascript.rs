//! JavaScript and JSX extractor.

use super::engine::{GrammarSpec, TreeSitterExtractor};
use crate::processing::Language;
use crate::types::ExtractionConfig;

pub static GRAMMAR: GrammarSpec = GrammarSpec {
    language: Language::JavaScript,
    grammar: tree_sitter_javascript::language,
    function_kinds: &[
        "function_declaration",
        "generator_function_declaration",
        "function",
        "function_expression",
        "generator_function",
        "arrow_function",
        "method_definition",
    ],
    method_kinds: &["method_definition"],
    class_kinds: &["class_declaration", "class"],
    markup_kinds: &["jsx_element", "jsx_fragment"],
};

pub fn extractor(config: ExtractionConfig) -> TreeSitterExtractor {
    TreeSitterExtractor::new(&GRAMMAR, config)
}
