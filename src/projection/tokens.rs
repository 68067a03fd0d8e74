//! Highlighting tokens projected from a syntax tree.
//!
//! Every document line gets a [`TokenLine`]: a sorted list of `{start, scope}`
//! tokens where each token's scope runs until the next token starts (or the
//! line ends). The first token always starts at column 0.

use std::collections::HashMap;
use std::sync::Arc;

use crate::document::Document;
use crate::syntax::{Preorder, SyntaxNode, Visit};

/// A scope label starting at a byte column within a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub start: usize,
    pub scope: Arc<str>,
}

impl Token {
    pub fn new(start: usize, scope: impl Into<Arc<str>>) -> Self {
        Self {
            start,
            scope: scope.into(),
        }
    }
}

/// Tokens of one line, partitioning it: ascending, distinct starts, first at 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenLine {
    tokens: Vec<Token>,
}

impl TokenLine {
    /// A line covered entirely by `scope`
    pub fn uniform(scope: impl Into<Arc<str>>) -> Self {
        Self {
            tokens: vec![Token::new(0, scope)],
        }
    }

    /// Sorted and collapsed as a projected line would be; `tokens` must hold one at 0
    #[cfg(test)]
    pub(crate) fn from_tokens(tokens: Vec<Token>) -> Self {
        debug_assert!(tokens.iter().any(|token| token.start == 0));
        Self::normalize(tokens, usize::MAX)
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Scope covering byte `column`
    pub fn scope_at(&self, column: usize) -> &str {
        let index = self
            .tokens
            .partition_point(|token| token.start <= column)
            .saturating_sub(1);
        &self.tokens[index].scope
    }

    /// `(start, end, scope)` for every non-empty segment of a line `line_len` bytes long
    pub fn segments(&self, line_len: usize) -> impl Iterator<Item = (usize, usize, &str)> + '_ {
        self.tokens
            .iter()
            .enumerate()
            .map(move |(i, token)| {
                let end = self
                    .tokens
                    .get(i + 1)
                    .map_or(line_len, |next| next.start)
                    .min(line_len);
                (token.start, end, &*token.scope)
            })
            .filter(|(start, end, _)| start < end)
    }

    /// Sort raw tokens and collapse tokens sharing a start.
    ///
    /// The sort is stable, so among tokens with the same start the one pushed
    /// last survives; the traversal visits parents before children, so the
    /// innermost node wins. Tokens at or past the line end carry no width and
    /// are dropped (the first token is kept regardless).
    fn normalize(mut tokens: Vec<Token>, line_len: usize) -> Self {
        tokens.sort_by_key(|token| token.start);

        let mut normalized: Vec<Token> = Vec::with_capacity(tokens.len());
        for token in tokens {
            match normalized.last_mut() {
                Some(last) if last.start == token.start => *last = token,
                _ => normalized.push(token),
            }
        }
        normalized.retain(|token| token.start == 0 || token.start < line_len);

        Self { tokens: normalized }
    }
}

/// Node kind → scope label lookup
#[derive(Debug, Clone, Default)]
pub struct ScopeMap {
    scopes: HashMap<String, Arc<str>>,
}

impl ScopeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: impl Into<String>, scope: impl Into<Arc<str>>) {
        self.scopes.insert(kind.into(), scope.into());
    }

    pub fn get(&self, kind: &str) -> Option<&Arc<str>> {
        self.scopes.get(kind)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Distinct scope labels, sorted
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.scopes.values().map(|scope| &**scope).collect();
        labels.sort_unstable();
        labels.dedup();
        labels
    }
}

impl<K: Into<String>, V: Into<Arc<str>>> FromIterator<(K, V)> for ScopeMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ScopeMap::new();
        for (kind, scope) in iter {
            map.insert(kind, scope);
        }
        map
    }
}

/// Project a syntax tree onto per-line highlighting tokens.
///
/// Returns exactly one [`TokenLine`] per document line. For every node whose
/// kind has a scope, each line it touches receives a token at the
/// intersection's start (node scope) and one at its end (default scope).
/// Pure: the tree is walked, nothing is retained.
pub fn build_tokens<N: SyntaxNode>(
    root: N,
    doc: &Document,
    scope_map: &ScopeMap,
    default_scope: &str,
) -> Vec<TokenLine> {
    let default_scope: Arc<str> = Arc::from(default_scope);
    let line_count = doc.line_count();
    let mut raw: Vec<Vec<Token>> = (0..line_count)
        .map(|_| vec![Token::new(0, default_scope.clone())])
        .collect();

    for Visit { node, .. } in Preorder::new(root) {
        let Some(scope) = scope_map.get(node.kind()) else {
            continue;
        };
        let start = node.start_point();
        let end = node.end_point();
        if start.row >= line_count {
            continue;
        }

        for row in start.row..=end.row.min(line_count - 1) {
            let line_len = doc.line_length(row);
            let from = if row == start.row { start.column } else { 0 }.min(line_len);
            let to = if row == end.row { end.column } else { line_len }.min(line_len);
            if from >= to {
                continue;
            }
            raw[row].push(Token::new(from, scope.clone()));
            raw[row].push(Token::new(to, default_scope.clone()));
        }
    }

    raw.into_iter()
        .enumerate()
        .map(|(row, tokens)| TokenLine::normalize(tokens, doc.line_length(row)))
        .collect()
}
