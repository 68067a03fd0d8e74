//! LSP coordinates: 0-indexed lines, UTF-16 code unit columns.

use tower_lsp_server::ls_types;

use super::Document;
use super::position::{
    Range, Span, byte_to_utf16_column, clamp_offset, offset_to_point, span_to_range,
    utf16_to_byte_column,
};

/// Byte offset of an LSP position; lines and columns past the end clamp
pub fn lsp_position_to_offset(doc: &Document, position: ls_types::Position) -> usize {
    let line = position.line as usize;
    let Some(line_start) = doc.line_start(line) else {
        return doc.len();
    };
    let line_text = doc.line(line).unwrap_or_default();
    line_start + utf16_to_byte_column(line_text, position.character as usize)
}

/// LSP position of a byte offset (clamped into the document)
pub fn offset_to_lsp_position(doc: &Document, offset: usize) -> ls_types::Position {
    let point = offset_to_point(doc, clamp_offset(doc, offset));
    let line_text = doc.line(point.row).unwrap_or_default();
    ls_types::Position::new(
        point.row as u32,
        byte_to_utf16_column(line_text, point.column) as u32,
    )
}

pub fn offset_range_to_lsp(doc: &Document, start: usize, end: usize) -> ls_types::Range {
    ls_types::Range::new(
        offset_to_lsp_position(doc, start),
        offset_to_lsp_position(doc, end),
    )
}

/// LSP range of a 1-indexed [`Range`]
pub fn range_to_lsp(doc: &Document, range: Range) -> ls_types::Range {
    let to_lsp = |line: usize, column: usize| {
        let row = line.saturating_sub(1);
        let line_text = doc.line(row).unwrap_or_default();
        ls_types::Position::new(
            row as u32,
            byte_to_utf16_column(line_text, column.saturating_sub(1)) as u32,
        )
    };
    ls_types::Range::new(
        to_lsp(range.start_line, range.start_column),
        to_lsp(range.end_line, range.end_column),
    )
}

/// LSP range for an engine span, with the same fallbacks as [`span_to_range`]
pub fn span_to_lsp_range(doc: &Document, span: Option<Span>) -> ls_types::Range {
    range_to_lsp(doc, span_to_range(doc, span))
}
