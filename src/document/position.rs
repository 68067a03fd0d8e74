//! Offset ↔ position mapping for a document snapshot.
//!
//! Three coordinate systems meet here:
//! - byte offsets into the document (`usize`, also the engine's [`Span`] unit)
//! - tree-sitter [`Point`]s: 0-indexed row, byte column
//! - rendering [`Position`]s / [`Range`]s: 1-indexed line and byte column
//!
//! UTF-16 conversion for LSP clients happens per line via
//! [`byte_to_utf16_column`] and [`utf16_to_byte_column`].

use serde::{Deserialize, Serialize};
use tree_sitter::Point;

use super::Document;

/// 1-indexed line/column coordinate consumed by the rendering surface
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// First position of any document
    pub const START: Position = Position { line: 1, column: 1 };

    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Byte offset range exchanged with the analysis engine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// 1-indexed line/column rectangle consumed by the rendering surface
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Range {
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self {
            start_line: start.line,
            start_column: start.column,
            end_line: end.line,
            end_column: end.column,
        }
    }

    /// Zero-width range at `position`
    pub fn collapsed(position: Position) -> Self {
        Self::new(position, position)
    }

    pub fn start(&self) -> Position {
        Position::new(self.start_line, self.start_column)
    }

    pub fn end(&self) -> Position {
        Position::new(self.end_line, self.end_column)
    }

    pub fn is_empty(&self) -> bool {
        self.start() == self.end()
    }
}

/// Clamp an offset into `[0, document length]`
pub fn clamp_offset(doc: &Document, offset: usize) -> usize {
    offset.min(doc.len())
}

/// Convert a byte offset to a 1-indexed position.
///
/// The offset is clamped first. An offset sitting on a line terminator maps
/// to the column just past the line's last byte.
pub fn offset_to_position(doc: &Document, offset: usize) -> Position {
    let point = offset_to_point(doc, offset);
    Position::new(point.row + 1, point.column + 1)
}

/// Convert a 1-indexed position to a byte offset.
///
/// Lines past the end clamp to the last line and columns past the line end
/// clamp to the line end, so the result always lies in `[0, len]`.
pub fn position_to_offset(doc: &Document, position: Position) -> usize {
    let row = position.line.clamp(1, doc.line_count()) - 1;
    let column = position.column.saturating_sub(1);
    point_to_offset(doc, Point::new(row, column))
}

/// Convert a byte offset to a tree-sitter point (0-indexed row, byte column)
pub fn offset_to_point(doc: &Document, offset: usize) -> Point {
    let offset = clamp_offset(doc, offset);
    let mut row = 0;
    let mut low = 0;
    let mut high = doc.line_count();
    // Last line whose start is <= offset
    while low < high {
        let mid = (low + high) / 2;
        match doc.line_start(mid) {
            Some(start) if start <= offset => {
                row = mid;
                low = mid + 1;
            }
            _ => high = mid,
        }
    }
    let line_start = doc.line_start(row).unwrap_or(0);
    Point::new(row, offset - line_start)
}

/// Convert a tree-sitter point to a byte offset, clamping into the document
pub fn point_to_offset(doc: &Document, point: Point) -> usize {
    let Some(line_start) = doc.line_start(point.row) else {
        return doc.len();
    };
    line_start + point.column.min(doc.line_length(point.row))
}

/// Range covering the byte offsets `start..end`
pub fn offset_range(doc: &Document, start: usize, end: usize) -> Range {
    Range::new(offset_to_position(doc, start), offset_to_position(doc, end))
}

/// Convert an engine span into a range the rendering surface can underline.
///
/// - `None` (missing or malformed span): zero-width range at document start
/// - reversed spans are normalized
/// - zero-width spans are widened to one character, backwards when the span
///   sits at the document end
pub fn span_to_range(doc: &Document, span: Option<Span>) -> Range {
    let Some(span) = span else {
        return Range::collapsed(Position::START);
    };

    let mut start = clamp_offset(doc, span.start.min(span.end));
    let mut end = clamp_offset(doc, span.start.max(span.end));

    if start == end {
        if let Some(ch) = doc.text().get(end..).and_then(|rest| rest.chars().next()) {
            end += ch.len_utf8();
        } else if let Some(ch) = doc.text().get(..start).and_then(|head| head.chars().next_back())
        {
            start -= ch.len_utf8();
        }
    }

    offset_range(doc, start, end)
}

/// Convert a byte column to a UTF-16 column within a line.
///
/// Columns inside a multi-byte character resolve to that character's start;
/// columns past the end resolve to the line's UTF-16 length.
pub fn byte_to_utf16_column(line_text: &str, byte_column: usize) -> usize {
    let mut utf16 = 0;
    for (index, ch) in line_text.char_indices() {
        if index + ch.len_utf8() > byte_column {
            break;
        }
        utf16 += ch.len_utf16();
    }
    utf16
}

/// Convert a UTF-16 column to a byte column within a line.
///
/// Columns past the end of the line resolve to the line's byte length.
pub fn utf16_to_byte_column(line_text: &str, utf16_column: usize) -> usize {
    let mut utf16 = 0;
    for (index, ch) in line_text.char_indices() {
        if utf16 >= utf16_column {
            return index;
        }
        utf16 += ch.len_utf16();
    }
    line_text.len()
}
