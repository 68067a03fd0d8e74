//! Engine replies translated into LSP hover and completion payloads.
//!
//! Both entry points swallow engine failures: the failure is logged and the
//! editor sees an empty completion list or no hover.

use log::{debug, warn};
use tower_lsp_server::ls_types::{
    CompletionItem, CompletionItemKind, CompletionTextEdit, Documentation, Hover, HoverContents,
    InsertTextFormat, MarkupContent, MarkupKind, TextEdit,
};

use crate::document::{Document, Position, offset_range_to_lsp, position_to_offset, span_to_lsp_range};
use crate::engine::{EngineHandle, RawCompletionItem};
use crate::error::EngineError;

const LOG_TARGET: &str = "treelens::adapter";

/// Engine kind label → LSP completion kind
const KIND_TABLE: &[(&str, CompletionItemKind)] = &[
    ("function", CompletionItemKind::FUNCTION),
    ("method", CompletionItemKind::METHOD),
    ("constructor", CompletionItemKind::CONSTRUCTOR),
    ("variable", CompletionItemKind::VARIABLE),
    ("field", CompletionItemKind::FIELD),
    ("property", CompletionItemKind::PROPERTY),
    ("constant", CompletionItemKind::CONSTANT),
    ("keyword", CompletionItemKind::KEYWORD),
    ("module", CompletionItemKind::MODULE),
    ("class", CompletionItemKind::CLASS),
    ("struct", CompletionItemKind::STRUCT),
    ("interface", CompletionItemKind::INTERFACE),
    ("enum", CompletionItemKind::ENUM),
    ("enumMember", CompletionItemKind::ENUM_MEMBER),
    ("type", CompletionItemKind::TYPE_PARAMETER),
    ("value", CompletionItemKind::VALUE),
    ("snippet", CompletionItemKind::SNIPPET),
    ("operator", CompletionItemKind::OPERATOR),
    ("file", CompletionItemKind::FILE),
];

/// Completion kind for an engine kind label; unknown or absent labels map to `TEXT`
pub fn completion_kind(label: Option<&str>) -> CompletionItemKind {
    label
        .and_then(|label| {
            KIND_TABLE
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(label))
                .map(|(_, kind)| *kind)
        })
        .unwrap_or(CompletionItemKind::TEXT)
}

fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Byte range of the identifier touching `offset` (empty when there is none)
pub fn word_range(doc: &Document, offset: usize) -> (usize, usize) {
    let bytes = doc.text().as_bytes();
    let offset = offset.min(bytes.len());

    let start = bytes[..offset]
        .iter()
        .rposition(|b| !is_word_byte(*b))
        .map_or(0, |i| i + 1);
    let end = bytes[offset..]
        .iter()
        .position(|b| !is_word_byte(*b))
        .map_or(bytes.len(), |i| offset + i);

    (start, end)
}

/// Map one engine completion item; it replaces `replace` (a byte range)
pub fn map_completion_item(
    doc: &Document,
    replace: (usize, usize),
    item: RawCompletionItem,
) -> CompletionItem {
    let insert_text_format = if item.is_snippet {
        InsertTextFormat::SNIPPET
    } else {
        InsertTextFormat::PLAIN_TEXT
    };
    let new_text = item.insert_text.unwrap_or_else(|| item.label.clone());

    CompletionItem {
        kind: Some(completion_kind(item.kind.as_deref())),
        detail: item.detail,
        documentation: item.documentation.map(Documentation::String),
        insert_text_format: Some(insert_text_format),
        text_edit: Some(CompletionTextEdit::Edit(TextEdit {
            range: offset_range_to_lsp(doc, replace.0, replace.1),
            new_text,
        })),
        label: item.label,
        ..Default::default()
    }
}

/// Hover payload from the engine; `None` when there is nothing to show or the call failed
pub async fn hover(engine: &EngineHandle, doc: &Document, position: Position) -> Option<Hover> {
    let offset = position_to_offset(doc, position);
    match engine.hover(doc.text(), offset).await {
        Ok(Some(data)) if !data.contents.trim().is_empty() => Some(Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value: data.contents,
            }),
            range: data.span.map(|span| span_to_lsp_range(doc, Some(span))),
        }),
        Ok(_) => None,
        Err(e) => {
            log_failure("hover", &e);
            None
        }
    }
}

/// Completion items from the engine; empty when the call failed
pub async fn completions(engine: &EngineHandle, doc: &Document, position: Position) -> Vec<CompletionItem> {
    let offset = position_to_offset(doc, position);
    match engine.completions(doc.text(), offset).await {
        Ok(data) => {
            let replace = word_range(doc, offset);
            data.items
                .into_iter()
                .map(|item| map_completion_item(doc, replace, item))
                .collect()
        }
        Err(e) => {
            log_failure("completion", &e);
            Vec::new()
        }
    }
}

fn log_failure(operation: &str, error: &EngineError) {
    match error {
        EngineError::Unsupported(_) => debug!(target: LOG_TARGET, "{} skipped: {}", operation, error),
        _ => warn!(target: LOG_TARGET, "{} failed: {}", operation, error),
    }
}
