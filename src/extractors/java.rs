//! Java extractor.

use super::engine::{GrammarSpec, TreeSitterExtractor};
use crate::processing::Language;
use crate::types::ExtractionConfig;

pub static GRAMMAR: GrammarSpec = GrammarSpec {
    language: Language::Java,
    grammar: tree_sitter_java::language,
    function_kinds: &[
        "method_declaration",
        "constructor_declaration",
        "lambda_expression",
    ],
    method_kinds: &["method_declaration", "constructor_declaration"],
    class_kinds: &[
        "class_declaration",
        "interface_declaration",
        "enum_declaration",
        "record_declaration",
    ],
    markup_kinds: &[],
};

pub fn extractor(config: ExtractionConfig) -> TreeSitterExtractor {
    TreeSitterExtractor::new(&GRAMMAR, config)
}
