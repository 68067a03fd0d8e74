//! Text synchronization for LSP didChange handling.
//!
//! Content changes arrive in order, each range expressed against the text
//! left by the previous change. Ranged changes become incremental edits;
//! a change without a range replaces the whole document and discards the
//! edits gathered before it.

use tower_lsp_server::ls_types::TextDocumentContentChangeEvent;

use crate::document::{Document, lsp_position_to_offset};
use crate::error::EditBatchError;
use crate::syntax::{EditBatch, EditBatchBuilder};

/// Turn the content changes of one didChange notification into an edit batch
pub(crate) fn content_changes_to_batch(
    doc: &Document,
    content_changes: Vec<TextDocumentContentChangeEvent>,
) -> Result<EditBatch, EditBatchError> {
    let mut builder = EditBatchBuilder::new(doc);

    for change in content_changes {
        match change.range {
            Some(range) => {
                let current = builder.current();
                let start = lsp_position_to_offset(current, range.start);
                let end = lsp_position_to_offset(current, range.end);
                builder.replace(start, end, &change.text)?;
            }
            None => builder.replace_all(change.text),
        }
    }

    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_lsp_server::ls_types::{Position, Range};

    fn ranged(start: (u32, u32), end: (u32, u32), text: &str) -> TextDocumentContentChangeEvent {
        TextDocumentContentChangeEvent {
            range: Some(Range::new(
                Position::new(start.0, start.1),
                Position::new(end.0, end.1),
            )),
            range_length: None,
            text: text.to_string(),
        }
    }

    fn full(text: &str) -> TextDocumentContentChangeEvent {
        TextDocumentContentChangeEvent {
            range: None,
            range_length: None,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_incremental_change_produces_edit() {
        let doc = Document::new("hello world");
        let batch = content_changes_to_batch(&doc, vec![ranged((0, 6), (0, 11), "rust")]).unwrap();

        assert_eq!(batch.text(), "hello rust");
        assert!(!batch.is_full_replace());
        assert_eq!(batch.edits().len(), 1);
        assert_eq!(batch.edits()[0].start_byte, 6);
        assert_eq!(batch.edits()[0].old_end_byte, 11);
        assert_eq!(batch.edits()[0].new_end_byte, 10);
    }

    #[test]
    fn test_changes_use_running_coordinates() {
        let doc = Document::new("aaa bbb ccc");
        let batch = content_changes_to_batch(
            &doc,
            vec![
                ranged((0, 0), (0, 3), "A"),
                // "ccc" now starts at column 6
                ranged((0, 6), (0, 9), "C"),
            ],
        )
        .unwrap();

        assert_eq!(batch.text(), "A bbb C");
        assert_eq!(batch.edits().len(), 2);
        assert_eq!(batch.edits()[1].start_byte, 6);
    }

    #[test]
    fn test_full_sync_discards_earlier_edits() {
        let doc = Document::new("hello world");
        let batch = content_changes_to_batch(
            &doc,
            vec![ranged((0, 0), (0, 5), "hi"), full("final content")],
        )
        .unwrap();

        assert_eq!(batch.text(), "final content");
        assert!(batch.is_full_replace());
        assert!(batch.edits().is_empty());
    }

    #[test]
    fn test_utf16_columns_map_to_bytes() {
        let doc = Document::new("a😀b\n");
        // 😀 spans UTF-16 columns 1..3 and bytes 1..5
        let batch = content_changes_to_batch(&doc, vec![ranged((0, 1), (0, 3), "x")]).unwrap();

        assert_eq!(batch.text(), "axb\n");
        assert_eq!(batch.edits()[0].old_end_byte, 5);
    }

    #[test]
    fn test_empty_change_list_keeps_text() {
        let doc = Document::new("unchanged");
        let batch = content_changes_to_batch(&doc, Vec::new()).unwrap();
        assert_eq!(batch.text(), "unchanged");
        assert!(batch.edits().is_empty());
    }
}
