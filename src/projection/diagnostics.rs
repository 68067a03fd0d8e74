//! Structural diagnostics for error and missing nodes.

use std::fmt;

use serde::Serialize;

use crate::document::{Document, Span, point_to_offset};
use crate::syntax::{Preorder, SyntaxNode, Visit};

/// Source label attached to diagnostics produced from the syntax tree
pub const SYNTAX_SOURCE: &str = "treelens";

/// Source label attached to diagnostics reported by the analysis engine
pub const ENGINE_SOURCE: &str = "engine";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticCode {
    /// Required syntax is absent
    Missing,
    /// The parser could not make sense of a region
    Syntax,
    /// Reported by the analysis engine
    Engine,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::Missing => "missing",
            DiagnosticCode::Syntax => "syntax",
            DiagnosticCode::Engine => "engine",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    pub severity: Severity,
    pub code: DiagnosticCode,
    /// `None` when no usable span could be derived; rendered at document start
    pub span: Option<Span>,
    pub source: &'static str,
}

impl Diagnostic {
    /// Diagnostic for an engine `{status: err}` reply.
    ///
    /// The engine's span is taken as is; a missing or malformed one becomes
    /// `None` and [`crate::document::span_to_range`] places it at document start.
    pub fn from_engine_error(message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Error,
            code: DiagnosticCode::Engine,
            span,
            source: ENGINE_SOURCE,
        }
    }

    fn sort_key(&self) -> usize {
        self.span.map_or(0, |span| span.start)
    }
}

/// Sort diagnostics by span start; diagnostics without a span come first
pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by_key(Diagnostic::sort_key);
}

/// Collect one diagnostic per missing node and per outermost error node.
///
/// An error node nested directly in another error node is part of the same
/// malformed region and is not reported again.
pub fn collect_diagnostics<N: SyntaxNode>(root: N, doc: &Document) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for Visit {
        node,
        parent_is_error,
    } in Preorder::new(root)
    {
        if node.is_missing() {
            diagnostics.push(Diagnostic {
                message: format!("missing {}", node.kind()),
                severity: Severity::Error,
                code: DiagnosticCode::Missing,
                span: Some(node_span(&node, doc)),
                source: SYNTAX_SOURCE,
            });
        } else if node.is_error() && !parent_is_error {
            diagnostics.push(Diagnostic {
                message: "syntax error".to_string(),
                severity: Severity::Error,
                code: DiagnosticCode::Syntax,
                span: Some(node_span(&node, doc)),
                source: SYNTAX_SOURCE,
            });
        }
    }

    sort_diagnostics(&mut diagnostics);
    diagnostics
}

fn node_span<N: SyntaxNode>(node: &N, doc: &Document) -> Span {
    Span::new(
        point_to_offset(doc, node.start_point()),
        point_to_offset(doc, node.end_point()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Position, Range, span_to_range};
    use crate::syntax::test_helpers::{FixtureNode, error, leaf, missing};

    fn codes(diagnostics: &[Diagnostic]) -> Vec<&str> {
        diagnostics.iter().map(|d| d.code.as_str()).collect()
    }

    #[test]
    fn test_nested_error_chain_reports_outermost_only() {
        let doc = Document::new("let = = = 1;");
        let root = FixtureNode::branch(
            "source_file",
            (0, 0),
            (0, 12),
            vec![error(
                (0, 4),
                (0, 9),
                vec![error((0, 5), (0, 9), vec![error((0, 6), (0, 9), vec![])])],
            )],
        );

        let diagnostics = collect_diagnostics(&root, &doc);
        assert_eq!(codes(&diagnostics), vec!["syntax"]);
        assert_eq!(diagnostics[0].span, Some(Span::new(4, 9)));
    }

    #[test]
    fn test_missing_and_error_sorted_by_start() {
        let doc = Document::new("value");
        // Error node listed first so sorting has work to do
        let root = FixtureNode::branch(
            "root",
            (0, 0),
            (0, 5),
            vec![error((0, 2), (0, 3), vec![]), missing(";", (0, 0))],
        );

        let diagnostics = collect_diagnostics(&root, &doc);
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(codes(&diagnostics), vec!["missing", "syntax"]);
        assert_eq!(diagnostics[0].message, "missing ;");
        assert_eq!(diagnostics[0].span, Some(Span::new(0, 0)));
        assert_eq!(diagnostics[1].span, Some(Span::new(2, 3)));

        // The zero-width missing span still renders as a visible range
        let range = span_to_range(&doc, diagnostics[0].span);
        assert!(!range.is_empty());
    }

    #[test]
    fn test_separate_error_regions_each_reported() {
        let doc = Document::new("a ! b ! c");
        let root = FixtureNode::branch(
            "root",
            (0, 0),
            (0, 9),
            vec![
                leaf("identifier", (0, 0), (0, 1)),
                error((0, 2), (0, 3), vec![]),
                leaf("identifier", (0, 4), (0, 5)),
                error((0, 6), (0, 7), vec![]),
            ],
        );
        let diagnostics = collect_diagnostics(&root, &doc);
        assert_eq!(codes(&diagnostics), vec!["syntax", "syntax"]);
    }

    #[test]
    fn test_error_below_non_error_inside_error_is_reported() {
        // ERROR > expression > ERROR: the inner error's parent is not an error
        let doc = Document::new("((x)");
        let root = error(
            (0, 0),
            (0, 4),
            vec![FixtureNode::branch(
                "expression",
                (0, 1),
                (0, 4),
                vec![error((0, 2), (0, 3), vec![])],
            )],
        );
        let diagnostics = collect_diagnostics(&root, &doc);
        assert_eq!(diagnostics.len(), 2);
    }

    #[test]
    fn test_engine_diagnostic_without_span_sorts_first() {
        let doc = Document::new("value");
        let mut diagnostics = vec![
            Diagnostic::from_engine_error("late", Some(Span::new(3, 4))),
            Diagnostic::from_engine_error("nowhere", None),
        ];
        sort_diagnostics(&mut diagnostics);

        assert_eq!(diagnostics[0].message, "nowhere");
        assert_eq!(diagnostics[0].code, DiagnosticCode::Engine);
        assert_eq!(
            span_to_range(&doc, diagnostics[0].span),
            Range::collapsed(Position::START)
        );
    }

    #[test]
    fn test_rust_parse_errors() {
        let text = "fn main() {\n    let x = ;\n}\n";
        let doc = Document::new(text);
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_rust::LANGUAGE.into())
            .unwrap();
        let tree = parser.parse(text, None).unwrap();

        let diagnostics = collect_diagnostics(tree.root_node(), &doc);
        assert!(!diagnostics.is_empty());
        for pair in diagnostics.windows(2) {
            assert!(pair[0].sort_key() <= pair[1].sort_key());
        }
        for diagnostic in &diagnostics {
            let span = diagnostic.span.unwrap();
            assert!(span.start <= span.end && span.end <= doc.len());
        }
    }

    #[test]
    fn test_clean_tree_has_no_diagnostics() {
        let text = "fn main() {}\n";
        let doc = Document::new(text);
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_rust::LANGUAGE.into())
            .unwrap();
        let tree = parser.parse(text, None).unwrap();
        assert!(collect_diagnostics(tree.root_node(), &doc).is_empty());
    }
}
