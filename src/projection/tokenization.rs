//! Per-line tokenization protocol over precomputed token lines.
//!
//! The rendering surface asks for one line at a time, threading an opaque
//! state from line to line. Token lines are computed once per reparse by
//! [`super::build_tokens`]; the adapter only looks them up. The epoch in the
//! state ties it to the reparse it was produced under.

use std::sync::Arc;

use super::tokens::TokenLine;

/// Position in the per-line protocol: the next line to tokenize, under `epoch`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenizationState {
    pub line_index: usize,
    pub epoch: u64,
}

/// Tokens for one line plus the state to pass when asking for the next line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineTokens {
    pub tokens: TokenLine,
    pub end_state: TokenizationState,
}

#[derive(Debug, Clone)]
pub struct TokenizationStateAdapter {
    lines: Vec<TokenLine>,
    epoch: u64,
    default_scope: Arc<str>,
}

impl TokenizationStateAdapter {
    /// Empty adapter; every line reads as default scope until lines arrive
    pub fn new(default_scope: impl Into<Arc<str>>) -> Self {
        Self {
            lines: Vec::new(),
            epoch: 0,
            default_scope: default_scope.into(),
        }
    }

    pub fn initial_state(&self) -> TokenizationState {
        TokenizationState {
            line_index: 0,
            epoch: self.epoch,
        }
    }

    /// Tokens for `line_index`.
    ///
    /// The prior state never shortcuts the lookup; lines are served from the
    /// current cache only. An index the cache does not cover yields one
    /// full-line default-scope token.
    pub fn tokenize_line(&self, line_index: usize, _prior: TokenizationState) -> LineTokens {
        let tokens = self
            .lines
            .get(line_index)
            .cloned()
            .unwrap_or_else(|| TokenLine::uniform(self.default_scope.clone()));

        LineTokens {
            tokens,
            end_state: TokenizationState {
                line_index: line_index + 1,
                epoch: self.epoch,
            },
        }
    }

    /// Install the lines of a completed reparse; advances the epoch once
    pub fn replace_lines(&mut self, lines: Vec<TokenLine>) {
        self.lines = lines;
        self.epoch += 1;
    }

    /// Whether `state` was produced under the current epoch
    pub fn is_current(&self, state: &TokenizationState) -> bool {
        state.epoch == self.epoch
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn lines(&self) -> &[TokenLine] {
        &self.lines
    }

    pub fn default_scope(&self) -> &str {
        &self.default_scope
    }

    /// Change the fallback scope; the next `replace_lines` applies it to projected lines
    pub fn set_default_scope(&mut self, scope: impl Into<Arc<str>>) {
        self.default_scope = scope.into();
    }
}
