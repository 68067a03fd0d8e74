//! Text change batches and the tree-sitter edits they imply.
//!
//! Two input shapes reach this module:
//!
//! - **Host batches** ([`EditBatch::from_changes`]): every change's offset is
//!   relative to the document *before* the batch. Changes are sorted ascending
//!   by offset, overlapping changes are rejected, and each change is then
//!   replayed with the running byte delta of the changes before it.
//! - **Sequential changes** ([`EditBatchBuilder`]): each change is relative to
//!   the text produced by the previous one, which is how LSP `didChange`
//!   delivers ranged edits.
//!
//! Either way the result is the post-batch text plus one [`InputEdit`] per
//! change, each expressed in the coordinates of the text at the moment that
//! change applies. That is the order `Tree::edit` must see them in.

use serde::{Deserialize, Serialize};
use tree_sitter::{InputEdit, Point};

use crate::document::{Document, offset_to_point};
use crate::error::EditBatchError;

/// One contiguous replacement as delivered by the host editor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextChange {
    pub range_offset: usize,
    pub range_length: usize,
    pub text: String,
}

impl TextChange {
    pub fn new(range_offset: usize, range_length: usize, text: impl Into<String>) -> Self {
        Self {
            range_offset,
            range_length,
            text: text.into(),
        }
    }

    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self::new(offset, 0, text)
    }

    fn range_end(&self) -> Option<usize> {
        self.range_offset.checked_add(self.range_length)
    }
}

/// Where inserted `text` ends when it starts at `start`.
///
/// Rows and columns are 0-indexed and columns count bytes, matching
/// tree-sitter's own convention.
pub fn compute_new_end_position(start: Point, text: &str) -> Point {
    match text.rfind('\n') {
        None => Point::new(start.row, start.column + text.len()),
        Some(last_break) => {
            let breaks = text.bytes().filter(|b| *b == b'\n').count();
            Point::new(start.row + breaks, text.len() - last_break - 1)
        }
    }
}

/// The outcome of applying a batch of changes to a document's text
#[derive(Debug, Clone)]
pub struct EditBatch {
    text: String,
    edits: Vec<InputEdit>,
    full_replace: bool,
}

impl EditBatch {
    /// Apply a host batch whose offsets all refer to `doc`.
    ///
    /// Changes are applied in ascending offset order regardless of input
    /// order. At one offset, pure inserts go before a replacement starting
    /// there and keep their input order among themselves. Any overlap
    /// rejects the whole batch and leaves nothing applied.
    pub fn from_changes(doc: &Document, changes: &[TextChange]) -> Result<Self, EditBatchError> {
        let mut sorted: Vec<&TextChange> = changes.iter().collect();
        sorted.sort_by_key(|change| (change.range_offset, change.range_length != 0));

        let mut previous_end = 0;
        for change in &sorted {
            let end = change.range_end().ok_or(EditBatchError::OutOfBounds {
                start: change.range_offset,
                end: usize::MAX,
                len: doc.len(),
            })?;
            if change.range_offset < previous_end {
                return Err(EditBatchError::Overlapping {
                    previous_end,
                    next_start: change.range_offset,
                });
            }
            previous_end = end;
        }

        let mut builder = EditBatchBuilder::new(doc);
        let mut delta: isize = 0;
        for change in sorted {
            let start = change.range_offset.saturating_add_signed(delta);
            let end = start + change.range_length;
            builder.replace(start, end, &change.text)?;
            delta += change.text.len() as isize - change.range_length as isize;
        }
        Ok(builder.finish())
    }

    /// Replace the whole document; the next parse starts from scratch
    pub fn full(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            edits: Vec::new(),
            full_replace: true,
        }
    }

    /// Post-batch text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Edits in application order; empty for a full replacement
    pub fn edits(&self) -> &[InputEdit] {
        &self.edits
    }

    /// Whether the tree cannot be reused as a reparse hint
    pub fn is_full_replace(&self) -> bool {
        self.full_replace
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// Accumulates sequential changes, each relative to the text after the last
pub struct EditBatchBuilder {
    current: Document,
    edits: Vec<InputEdit>,
    full_replace: bool,
}

impl EditBatchBuilder {
    pub fn new(doc: &Document) -> Self {
        Self {
            current: doc.clone(),
            edits: Vec::new(),
            full_replace: false,
        }
    }

    /// The text as it stands after the changes so far
    pub fn current(&self) -> &Document {
        &self.current
    }

    /// Replace bytes `start..end` of the current text with `text`
    pub fn replace(&mut self, start: usize, end: usize, text: &str) -> Result<(), EditBatchError> {
        let current_text = self.current.text();
        if start > end || end > current_text.len() {
            return Err(EditBatchError::OutOfBounds {
                start,
                end,
                len: current_text.len(),
            });
        }
        for offset in [start, end] {
            if !current_text.is_char_boundary(offset) {
                return Err(EditBatchError::NotCharBoundary { offset });
            }
        }

        let start_position = offset_to_point(&self.current, start);
        let edit = InputEdit {
            start_byte: start,
            old_end_byte: end,
            new_end_byte: start + text.len(),
            start_position,
            old_end_position: offset_to_point(&self.current, end),
            new_end_position: compute_new_end_position(start_position, text),
        };

        let mut next = String::with_capacity(current_text.len() - (end - start) + text.len());
        next.push_str(&current_text[..start]);
        next.push_str(text);
        next.push_str(&current_text[end..]);

        self.current = Document::with_version(next, self.current.version());
        if !self.full_replace {
            self.edits.push(edit);
        }
        Ok(())
    }

    /// Replace the whole text; edits gathered so far no longer describe the tree
    pub fn replace_all(&mut self, text: impl Into<String>) {
        self.current = Document::with_version(text.into(), self.current.version());
        self.edits.clear();
        self.full_replace = true;
    }

    pub fn finish(self) -> EditBatch {
        EditBatch {
            text: self.current.into_text(),
            edits: self.edits,
            full_replace: self.full_replace,
        }
    }
}
