//! In-memory syntax trees for exercising projection code on exact shapes.

use tree_sitter::Point;

use super::SyntaxNode;

#[derive(Debug, Clone)]
pub(crate) struct FixtureNode {
    kind: &'static str,
    start: Point,
    end: Point,
    named: bool,
    error: bool,
    missing: bool,
    children: Vec<FixtureNode>,
}

impl FixtureNode {
    pub(crate) fn branch(
        kind: &'static str,
        start: (usize, usize),
        end: (usize, usize),
        children: Vec<FixtureNode>,
    ) -> Self {
        Self {
            kind,
            start: Point::new(start.0, start.1),
            end: Point::new(end.0, end.1),
            named: true,
            error: false,
            missing: false,
            children,
        }
    }

    /// Anonymous token such as `(` or `fn`
    pub(crate) fn anonymous(mut self) -> Self {
        self.named = false;
        self
    }

    /// Tear the tree down level by level so very deep fixtures drop without recursion
    pub(crate) fn dismantle(self) {
        let mut pending = vec![self];
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

pub(crate) fn leaf(kind: &'static str, start: (usize, usize), end: (usize, usize)) -> FixtureNode {
    FixtureNode::branch(kind, start, end, Vec::new())
}

pub(crate) fn error(
    start: (usize, usize),
    end: (usize, usize),
    children: Vec<FixtureNode>,
) -> FixtureNode {
    FixtureNode {
        error: true,
        ..FixtureNode::branch("ERROR", start, end, children)
    }
}

pub(crate) fn missing(kind: &'static str, at: (usize, usize)) -> FixtureNode {
    FixtureNode {
        missing: true,
        ..leaf(kind, at, at)
    }
}

impl<'a> SyntaxNode for &'a FixtureNode {
    fn kind(&self) -> &str {
        self.kind
    }

    fn start_point(&self) -> Point {
        self.start
    }

    fn end_point(&self) -> Point {
        self.end
    }

    fn children(&self) -> Vec<Self> {
        self.children.iter().collect()
    }

    fn named_children(&self) -> Vec<Self> {
        self.children.iter().filter(|c| c.named).collect()
    }

    fn is_error(&self) -> bool {
        self.error
    }

    fn is_missing(&self) -> bool {
        self.missing
    }
}
