//! Tree-sitter extraction engine shared by every language.
//!
//! Each language contributes a [`GrammarSpec`] naming the node kinds it treats
//! as function-like, method-like, class-like or embedded markup. The engine
//! parses, rejects trees containing syntax errors, then walks the tree in
//! pre-order with an explicit stack so deeply nested input cannot exhaust the
//! call stack.

use tree_sitter::{Node, Parser, Tree};

use super::base::{ExtractedUnit, Extractor};
use crate::error::ExtractionError;
use crate::processing::Language;
use crate::types::{ChunkKind, ExtractionConfig};

/// Node-kind tables for one tree-sitter grammar.
pub struct GrammarSpec {
    pub language: Language,
    pub grammar: fn() -> tree_sitter::Language,
    /// Function-like nodes: declarations, methods, lambdas.
    pub function_kinds: &'static [&'static str],
    /// Subset of `function_kinds` that are always methods.
    pub method_kinds: &'static [&'static str],
    /// Class-like nodes, counted only when they have a body.
    pub class_kinds: &'static [&'static str],
    /// Embedded component blocks, emitted without a kind.
    pub markup_kinds: &'static [&'static str],
}

impl GrammarSpec {
    fn classify(&self, node: &Node, scope: Scope) -> Option<Unit> {
        // Keywords such as `function` or `lambda` share names with the
        // expression nodes they introduce.
        if !node.is_named() {
            return None;
        }
        let kind = node.kind();
        if self.function_kinds.contains(&kind) {
            let chunk_kind = if self.method_kinds.contains(&kind) || scope == Scope::Class {
                ChunkKind::Method
            } else {
                ChunkKind::Function
            };
            Some(Unit::Code(chunk_kind))
        } else if self.class_kinds.contains(&kind) && node.child_by_field_name("body").is_some() {
            Some(Unit::Code(ChunkKind::Class))
        } else if self.markup_kinds.contains(&kind) {
            Some(Unit::Markup)
        } else {
            None
        }
    }
}

/// Innermost enclosing unit of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    TopLevel,
    Function,
    Class,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Code(ChunkKind),
    Markup,
}

struct Frame<'tree> {
    node: Node<'tree>,
    depth: usize,
    scope: Scope,
}

/// Extractor backed by a tree-sitter grammar.
pub struct TreeSitterExtractor {
    spec: &'static GrammarSpec,
    config: ExtractionConfig,
}

impl TreeSitterExtractor {
    pub fn new(spec: &'static GrammarSpec, config: ExtractionConfig) -> Self {
        Self { spec, config }
    }

    /// Check that the grammar loads into a parser.
    pub fn verify_grammar(&self) -> Result<(), ExtractionError> {
        self.parser().map(|_| ())
    }

    fn parser(&self) -> Result<Parser, ExtractionError> {
        // Parser is not Sync, so each extraction builds its own.
        let mut parser = Parser::new();
        parser
            .set_language(&(self.spec.grammar)())
            .map_err(|e| ExtractionError::Grammar(e.to_string()))?;
        Ok(parser)
    }

    fn parse(&self, source: &str) -> Result<Tree, ExtractionError> {
        let mut parser = self.parser()?;
        let tree = parser
            .parse(source, None)
            .ok_or(ExtractionError::ParseFailed)?;

        let root = tree.root_node();
        if root.has_error() {
            let (line, column) = self.first_error(root)?;
            return Err(ExtractionError::Syntax { line, column });
        }
        Ok(tree)
    }

    /// Position (1-indexed line, 0-indexed column) of the first error node.
    fn first_error(&self, root: Node) -> Result<(usize, usize), ExtractionError> {
        let mut stack = vec![root];
        let mut visited = 0usize;

        while let Some(node) = stack.pop() {
            visited += 1;
            if visited > self.config.max_nodes {
                return Err(ExtractionError::TooManyNodes {
                    limit: self.config.max_nodes,
                });
            }
            if node.is_error() || node.is_missing() {
                let pos = node.start_position();
                return Ok((pos.row + 1, pos.column));
            }
            push_children(&mut stack, node, |child| child.has_error().then_some(child));
        }

        let pos = root.start_position();
        Ok((pos.row + 1, pos.column))
    }

    fn collect(&self, root: Node, source: &str) -> Result<Vec<ExtractedUnit>, ExtractionError> {
        let mut units = Vec::new();
        let mut stack = vec![Frame {
            node: root,
            depth: 0,
            scope: Scope::TopLevel,
        }];
        let mut visited = 0usize;

        while let Some(Frame { node, depth, scope }) = stack.pop() {
            visited += 1;
            if visited > self.config.max_nodes {
                return Err(ExtractionError::TooManyNodes {
                    limit: self.config.max_nodes,
                });
            }
            if depth > self.config.max_depth {
                return Err(ExtractionError::TooDeep {
                    limit: self.config.max_depth,
                });
            }

            let mut child_scope = scope;
            match self.spec.classify(&node, scope) {
                Some(Unit::Code(ChunkKind::Class)) => {
                    child_scope = Scope::Class;
                    if self.config.include_classes {
                        units.push(unit(node, source, Some(ChunkKind::Class))?);
                    }
                }
                Some(Unit::Code(kind)) => {
                    child_scope = Scope::Function;
                    units.push(unit(node, source, Some(kind))?);
                }
                Some(Unit::Markup) => units.push(unit(node, source, None)?),
                None => {}
            }

            push_children(&mut stack, node, |child| {
                Some(Frame {
                    node: child,
                    depth: depth + 1,
                    scope: child_scope,
                })
            });
        }

        Ok(units)
    }
}

impl Extractor for TreeSitterExtractor {
    fn language(&self) -> Language {
        self.spec.language
    }

    fn try_extract(&self, source: &str) -> Result<Vec<ExtractedUnit>, ExtractionError> {
        let tree = self.parse(source)?;
        self.collect(tree.root_node(), source)
    }
}

/// Push children in reverse so they pop in document order.
fn push_children<'tree, T>(
    stack: &mut Vec<T>,
    node: Node<'tree>,
    mut frame: impl FnMut(Node<'tree>) -> Option<T>,
) {
    for i in (0..node.child_count()).rev() {
        if let Some(entry) = node.child(i).and_then(&mut frame) {
            stack.push(entry);
        }
    }
}

fn unit(node: Node, source: &str, kind: Option<ChunkKind>) -> Result<ExtractedUnit, ExtractionError> {
    let (start, end) = (node.start_byte(), node.end_byte());
    let text = source
        .get(start..end)
        .ok_or(ExtractionError::InvalidSpan { start, end })?;

    Ok(ExtractedUnit {
        text: text.to_string(),
        kind,
        byte_range: (start, end),
        line_range: (node.start_position().row + 1, node.end_position().row + 1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::python;

    fn limited(max_nodes: usize, max_depth: usize) -> TreeSitterExtractor {
        python::extractor(ExtractionConfig {
            max_nodes,
            max_depth,
            include_classes: false,
        })
    }

    #[test]
    fn test_verbatim_spans() {
        let source = "import os\n\ndef a():\n    return 1\n\n\ndef b(x):\n    return x * 2\n";
        let units = python::extractor(ExtractionConfig::default())
            .try_extract(source)
            .unwrap();

        assert_eq!(units.len(), 2);
        for unit in &units {
            let (start, end) = unit.byte_range;
            assert!(start <= end);
            assert_eq!(&source[start..end], unit.text);
        }
        assert_eq!(units[1].line_range, (7, 8));
    }

    #[test]
    fn test_node_limit_fails_closed() {
        let source = "def a():\n    return [1, 2, 3, 4, 5, 6, 7, 8]\n";
        let result = limited(5, 1000).try_extract(source);

        assert!(matches!(result, Err(ExtractionError::TooManyNodes { limit: 5 })));
        assert!(limited(5, 1000).extract(source).is_empty());
    }

    #[test]
    fn test_depth_limit_fails_closed() {
        let source = "x = ((((((((((1))))))))))\n";
        let result = limited(100_000, 4).try_extract(source);

        assert!(matches!(result, Err(ExtractionError::TooDeep { limit: 4 })));
    }

    #[test]
    fn test_syntax_error_position() {
        let source = "def ok():\n    return 1\n\ndef broken(:\n";
        let result = python::extractor(ExtractionConfig::default()).try_extract(source);

        match result {
            Err(ExtractionError::Syntax { line, .. }) => assert!(line >= 1),
            other => panic!("expected syntax error, got {:?}", other),
        }
    }
}
