//! Read-only view of concrete syntax tree nodes.
//!
//! Projection code is written against [`SyntaxNode`] rather than
//! `tree_sitter::Node` directly so that unusual shapes (nested error chains,
//! zero-width missing nodes) can be built exactly in tests.

use tree_sitter::Point;

/// A node of a concrete syntax tree.
pub trait SyntaxNode: Sized {
    /// Grammar kind label (e.g. `identifier`, `ERROR`)
    fn kind(&self) -> &str;

    /// Start in 0-indexed rows and byte columns
    fn start_point(&self) -> Point;

    /// End (exclusive) in 0-indexed rows and byte columns
    fn end_point(&self) -> Point;

    /// All children, anonymous tokens included, in document order
    fn children(&self) -> Vec<Self>;

    /// Semantically meaningful children only, in document order
    fn named_children(&self) -> Vec<Self>;

    /// The parser wrapped unparseable input in this node
    fn is_error(&self) -> bool;

    /// Zero-width placeholder for syntax the grammar requires but the text lacks
    fn is_missing(&self) -> bool;
}

impl<'tree> SyntaxNode for tree_sitter::Node<'tree> {
    fn kind(&self) -> &str {
        tree_sitter::Node::kind(self)
    }

    fn start_point(&self) -> Point {
        self.start_position()
    }

    fn end_point(&self) -> Point {
        self.end_position()
    }

    fn children(&self) -> Vec<Self> {
        let mut cursor = self.walk();
        tree_sitter::Node::children(self, &mut cursor).collect()
    }

    fn named_children(&self) -> Vec<Self> {
        let mut cursor = self.walk();
        tree_sitter::Node::named_children(self, &mut cursor).collect()
    }

    fn is_error(&self) -> bool {
        tree_sitter::Node::is_error(self)
    }

    fn is_missing(&self) -> bool {
        tree_sitter::Node::is_missing(self)
    }
}

/// A node visited by [`Preorder`], with the error flag of its parent
#[derive(Debug)]
pub struct Visit<N> {
    pub node: N,
    pub parent_is_error: bool,
}

/// Pre-order depth-first traversal driven by an explicit stack.
///
/// Children are pushed in reverse so nodes come out in document order. Memory
/// grows with the widest frontier, not with nesting depth, so pathological
/// nesting cannot exhaust the call stack.
pub struct Preorder<N> {
    stack: Vec<Visit<N>>,
}

impl<N: SyntaxNode> Preorder<N> {
    pub fn new(root: N) -> Self {
        Self {
            stack: vec![Visit {
                node: root,
                parent_is_error: false,
            }],
        }
    }
}

impl<N: SyntaxNode> Iterator for Preorder<N> {
    type Item = Visit<N>;

    fn next(&mut self) -> Option<Self::Item> {
        let visit = self.stack.pop()?;
        let is_error = visit.node.is_error();
        self.stack
            .extend(visit.node.children().into_iter().rev().map(|child| Visit {
                node: child,
                parent_is_error: is_error,
            }));
        Some(visit)
    }
}
