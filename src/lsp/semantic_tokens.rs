//! Semantic tokens: how token lines reach the client.
//!
//! Scope labels are `type[.modifier...]`. The type must be in
//! [`LEGEND_TYPES`] or the segment is not reported; unknown modifiers are
//! ignored. Segments carrying the default scope are never reported, the
//! client's own default colouring covers them.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tower_lsp_server::ls_types::{
    SemanticToken, SemanticTokenModifier, SemanticTokenType, SemanticTokens, SemanticTokensDelta,
    SemanticTokensEdit, SemanticTokensFullDeltaResult, SemanticTokensLegend,
};
use url::Url;

use crate::document::{Document, byte_to_utf16_column};
use crate::projection::{LineTokens, TokenizationStateAdapter};

/// Semantic token types supported by the legend.
pub const LEGEND_TYPES: &[SemanticTokenType] = &[
    SemanticTokenType::COMMENT,
    SemanticTokenType::KEYWORD,
    SemanticTokenType::STRING,
    SemanticTokenType::NUMBER,
    SemanticTokenType::REGEXP,
    SemanticTokenType::OPERATOR,
    SemanticTokenType::NAMESPACE,
    SemanticTokenType::TYPE,
    SemanticTokenType::STRUCT,
    SemanticTokenType::CLASS,
    SemanticTokenType::INTERFACE,
    SemanticTokenType::ENUM,
    SemanticTokenType::ENUM_MEMBER,
    SemanticTokenType::TYPE_PARAMETER,
    SemanticTokenType::FUNCTION,
    SemanticTokenType::METHOD,
    SemanticTokenType::MACRO,
    SemanticTokenType::VARIABLE,
    SemanticTokenType::PARAMETER,
    SemanticTokenType::PROPERTY,
    SemanticTokenType::EVENT,
    SemanticTokenType::MODIFIER,
    SemanticTokenType::DECORATOR,
];

/// Semantic token modifiers supported by the legend.
pub const LEGEND_MODIFIERS: &[SemanticTokenModifier] = &[
    SemanticTokenModifier::DECLARATION,
    SemanticTokenModifier::DEFINITION,
    SemanticTokenModifier::READONLY,
    SemanticTokenModifier::STATIC,
    SemanticTokenModifier::DEPRECATED,
    SemanticTokenModifier::ABSTRACT,
    SemanticTokenModifier::ASYNC,
    SemanticTokenModifier::MODIFICATION,
    SemanticTokenModifier::DOCUMENTATION,
    SemanticTokenModifier::DEFAULT_LIBRARY,
];

pub fn legend() -> SemanticTokensLegend {
    SemanticTokensLegend {
        token_types: Vec::from(LEGEND_TYPES),
        token_modifiers: Vec::from(LEGEND_MODIFIERS),
    }
}

/// Legend type index and modifier bitset for a scope label.
///
/// `None` when the type part is not in [`LEGEND_TYPES`].
pub(crate) fn legend_entry(scope: &str) -> Option<(u32, u32)> {
    let (kind, modifiers) = scope.split_once('.').unwrap_or((scope, ""));
    let kind = LEGEND_TYPES.iter().position(|t| t.as_str() == kind)?;
    let bits = modifiers
        .split('.')
        .filter_map(|name| LEGEND_MODIFIERS.iter().position(|m| m.as_str() == name))
        .fold(0u32, |bits, index| bits | (1 << index));
    Some((kind as u32, bits))
}

/// Where the previous token started; each token is encoded relative to it
#[derive(Default)]
struct Anchor {
    line: usize,
    column: usize,
}

impl Anchor {
    fn advance(&mut self, line: usize, column: usize) -> (u32, u32) {
        let delta_start = if line == self.line {
            column - self.column
        } else {
            column
        };
        let delta = ((line - self.line) as u32, delta_start as u32);
        *self = Self { line, column };
        delta
    }
}

/// Encode the adapter's token lines as LSP semantic tokens for `doc`.
///
/// Lines are read through the per-line protocol, one document line at a
/// time. Columns beyond a line are clamped away.
pub fn encode_tokens(
    doc: &Document,
    tokens: &TokenizationStateAdapter,
    result_id: Option<String>,
) -> SemanticTokens {
    let default_scope = tokens.default_scope();
    let mut anchor = Anchor::default();
    let mut data = Vec::new();
    let mut state = tokens.initial_state();

    for row in 0..doc.line_count() {
        let LineTokens {
            tokens: token_line,
            end_state,
        } = tokens.tokenize_line(row, state);
        state = end_state;
        let Some(text) = doc.line(row) else {
            break;
        };

        for (start, end, scope) in token_line.segments(text.len()) {
            if scope == default_scope {
                continue;
            }
            let Some((token_type, token_modifiers_bitset)) = legend_entry(scope) else {
                continue;
            };
            let from = byte_to_utf16_column(text, start);
            let to = byte_to_utf16_column(text, end);
            if to <= from {
                continue;
            }

            let (delta_line, delta_start) = anchor.advance(row, from);
            data.push(SemanticToken {
                delta_line,
                delta_start,
                length: (to - from) as u32,
                token_type,
                token_modifiers_bitset,
            });
        }
    }

    SemanticTokens { result_id, data }
}

static LAST_RESULT_ID: AtomicU64 = AtomicU64::new(0);

/// Result ids count up from "1" across all documents
pub fn fresh_result_id() -> String {
    (LAST_RESULT_ID.fetch_add(1, Ordering::Relaxed) + 1).to_string()
}

/// The single edit turning `previous` into `current`, `None` when equal.
///
/// A shared suffix only counts when both arrays span the same number of
/// lines, since equal relative tokens would otherwise sit on different lines.
fn token_edit(previous: &[SemanticToken], current: &[SemanticToken]) -> Option<SemanticTokensEdit> {
    if previous == current {
        return None;
    }

    let prefix = previous
        .iter()
        .zip(current)
        .take_while(|(a, b)| a == b)
        .count();
    let (old, new) = (&previous[prefix..], &current[prefix..]);

    let span = |tokens: &[SemanticToken]| tokens.iter().map(|t| t.delta_line).sum::<u32>();
    let suffix = if span(previous) == span(current) {
        old.iter()
            .rev()
            .zip(new.iter().rev())
            .take_while(|(a, b)| a == b)
            .count()
    } else {
        0
    };

    // Offsets count integers, five per token
    Some(SemanticTokensEdit {
        start: (prefix * 5) as u32,
        delete_count: ((old.len() - suffix) * 5) as u32,
        data: Some(new[..new.len() - suffix].to_vec()),
    })
}

/// The tokens last sent for each document, kept as the base for deltas
#[derive(Default)]
pub struct SemanticTokenCache {
    sent: DashMap<Url, SemanticTokens>,
}

impl SemanticTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, url: Url, tokens: SemanticTokens) {
        self.sent.insert(url, tokens);
    }

    /// Record `current` and answer relative to what the client holds.
    ///
    /// Falls back to the full tokens unless `previous_result_id` names the
    /// result sent last.
    pub fn answer_delta(
        &self,
        url: Url,
        current: SemanticTokens,
        previous_result_id: &str,
    ) -> SemanticTokensFullDeltaResult {
        match self.sent.insert(url, current.clone()) {
            Some(base) if base.result_id.as_deref() == Some(previous_result_id) => {
                SemanticTokensFullDeltaResult::TokensDelta(SemanticTokensDelta {
                    edits: token_edit(&base.data, &current.data).into_iter().collect(),
                    result_id: current.result_id,
                })
            }
            _ => SemanticTokensFullDeltaResult::Tokens(current),
        }
    }

    pub fn forget(&self, url: &Url) {
        self.sent.remove(url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::{Token, TokenLine};

    fn index_of(token_type: SemanticTokenType) -> u32 {
        LEGEND_TYPES.iter().position(|t| *t == token_type).unwrap() as u32
    }

    fn line(tokens: &[(usize, &str)]) -> TokenLine {
        TokenLine::from_tokens(
            tokens
                .iter()
                .map(|&(start, scope)| Token::new(start, scope))
                .collect(),
        )
    }

    fn adapter(lines: Vec<TokenLine>) -> TokenizationStateAdapter {
        let mut adapter = TokenizationStateAdapter::new("text");
        adapter.replace_lines(lines);
        adapter
    }

    fn token(delta_line: u32, delta_start: u32, length: u32) -> SemanticToken {
        SemanticToken {
            delta_line,
            delta_start,
            length,
            token_type: 0,
            token_modifiers_bitset: 0,
        }
    }

    fn sent(result_id: &str, data: Vec<SemanticToken>) -> SemanticTokens {
        SemanticTokens {
            result_id: Some(result_id.to_string()),
            data,
        }
    }

    fn url() -> Url {
        Url::parse("file:///workspace/a.rs").unwrap()
    }

    #[test]
    fn test_legend_entry_splits_modifiers() {
        assert_eq!(legend_entry("comment"), Some((0, 0)));
        assert_eq!(
            legend_entry("variable.readonly.defaultLibrary"),
            Some((index_of(SemanticTokenType::VARIABLE), (1 << 2) | (1 << 9)))
        );
        // Unknown modifier ignored, unknown type rejected
        assert_eq!(
            legend_entry("keyword.shiny"),
            Some((index_of(SemanticTokenType::KEYWORD), 0))
        );
        assert_eq!(legend_entry("spell"), None);
        assert_eq!(legend_entry(""), None);
    }

    #[test]
    fn test_encode_skips_default_and_unknown_scopes() {
        let doc = Document::new("let x = \"s\";\n// c");
        let lines = vec![
            line(&[(0, "keyword"), (3, "text"), (4, "variable"), (5, "text"), (8, "string"), (11, "spell")]),
            line(&[(0, "comment")]),
        ];

        let tokens = encode_tokens(&doc, &adapter(lines), Some("7".to_string()));
        assert_eq!(tokens.result_id.as_deref(), Some("7"));

        let summary: Vec<_> = tokens
            .data
            .iter()
            .map(|t| (t.delta_line, t.delta_start, t.length, t.token_type))
            .collect();
        assert_eq!(
            summary,
            vec![
                (0, 0, 3, index_of(SemanticTokenType::KEYWORD)),
                (0, 4, 1, index_of(SemanticTokenType::VARIABLE)),
                (0, 4, 3, index_of(SemanticTokenType::STRING)),
                (1, 0, 4, index_of(SemanticTokenType::COMMENT)),
            ]
        );
    }

    #[test]
    fn test_encode_uses_utf16_columns() {
        let doc = Document::new("\"😀\" x");
        let lines = vec![line(&[(0, "string"), (6, "text"), (7, "variable")])];

        let tokens = encode_tokens(&doc, &adapter(lines), None);
        assert_eq!(tokens.data.len(), 2);
        // The string is 6 bytes but 4 UTF-16 units
        assert_eq!(tokens.data[0].length, 4);
        assert_eq!(tokens.data[1].delta_start, 5);
        assert_eq!(tokens.data[1].length, 1);
    }

    #[test]
    fn test_encode_clamps_to_document() {
        let doc = Document::new("ab");
        let lines = vec![line(&[(0, "keyword")]), line(&[(0, "comment")])];
        let tokens = encode_tokens(&doc, &adapter(lines), None);
        assert_eq!(tokens.data.len(), 1);
        assert_eq!(tokens.data[0].length, 2);
    }

    #[test]
    fn test_encode_reads_lines_through_adapter() {
        // Cache covers only the first of three lines, at epoch 1
        let doc = Document::new("fn\nx\ny");
        let tokens = adapter(vec![line(&[(0, "keyword")])]);
        assert_eq!(tokens.epoch(), 1);

        let encoded = encode_tokens(&doc, &tokens, None);
        assert_eq!(encoded.data.len(), 1);
        assert_eq!(encoded.data[0].token_type, index_of(SemanticTokenType::KEYWORD));
    }

    #[test]
    fn test_delta_against_the_result_the_client_holds() {
        let cache = SemanticTokenCache::new();
        cache.record(url(), sent("1", vec![token(0, 0, 3)]));

        let current = sent("2", vec![token(0, 0, 3), token(0, 4, 1)]);
        match cache.answer_delta(url(), current, "1") {
            SemanticTokensFullDeltaResult::TokensDelta(delta) => {
                assert_eq!(delta.result_id.as_deref(), Some("2"));
                let [edit] = delta.edits.as_slice() else {
                    panic!("expected one edit, got {:?}", delta.edits);
                };
                assert_eq!((edit.start, edit.delete_count), (5, 0));
                assert_eq!(edit.data.as_deref(), Some(&[token(0, 4, 1)][..]));
            }
            other => panic!("expected delta, got {other:?}"),
        }
    }

    #[test]
    fn test_full_tokens_when_base_is_unknown() {
        let cache = SemanticTokenCache::new();
        let current = sent("2", vec![token(0, 0, 3)]);
        assert!(matches!(
            cache.answer_delta(url(), current.clone(), "1"),
            SemanticTokensFullDeltaResult::Tokens(_)
        ));

        // Now "2" is cached; asking relative to an older id still gets full tokens
        assert!(matches!(
            cache.answer_delta(url(), sent("3", vec![]), "1"),
            SemanticTokensFullDeltaResult::Tokens(_)
        ));

        cache.record(url(), current);
        cache.forget(&url());
        assert!(matches!(
            cache.answer_delta(url(), sent("4", vec![]), "2"),
            SemanticTokensFullDeltaResult::Tokens(_)
        ));
    }

    #[test]
    fn test_suffix_ignored_when_lines_shift() {
        let previous = [token(0, 0, 3), token(1, 0, 2)];
        let current = [token(0, 0, 3), token(2, 0, 2)];

        let edit = token_edit(&previous, &current).unwrap();
        assert_eq!((edit.start, edit.delete_count), (5, 5));
        assert_eq!(edit.data, Some(vec![token(2, 0, 2)]));
    }

    #[test]
    fn test_suffix_shared_when_line_span_unchanged() {
        let previous = [token(0, 0, 3), token(0, 4, 1), token(1, 0, 2)];
        let current = [token(0, 0, 3), token(0, 4, 2), token(1, 0, 2)];

        let edit = token_edit(&previous, &current).unwrap();
        assert_eq!((edit.start, edit.delete_count), (5, 5));
        assert_eq!(edit.data, Some(vec![token(0, 4, 2)]));
    }

    #[test]
    fn test_unchanged_tokens_give_no_edits() {
        let data = vec![token(0, 0, 3)];
        assert!(token_edit(&data, &data).is_none());

        let cache = SemanticTokenCache::new();
        cache.record(url(), sent("1", data.clone()));
        match cache.answer_delta(url(), sent("2", data), "1") {
            SemanticTokensFullDeltaResult::TokensDelta(delta) => assert!(delta.edits.is_empty()),
            other => panic!("expected delta, got {other:?}"),
        }
    }

    #[test]
    fn test_result_ids_increase() {
        let first: u64 = fresh_result_id().parse().unwrap();
        let second: u64 = fresh_result_id().parse().unwrap();
        assert!(second > first);
    }
}
