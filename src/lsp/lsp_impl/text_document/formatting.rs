//! Formatting method for TreeLens.

use tower_lsp_server::jsonrpc::Result;
use tower_lsp_server::ls_types::{DocumentFormattingParams, TextEdit};

use crate::document::{Document, offset_range_to_lsp};
use crate::error::EngineError;

use super::super::{LOG_TARGET, TreeLens};

/// A single whole-document edit, or none when the text is already formatted
fn formatting_edits(doc: &Document, formatted: String) -> Vec<TextEdit> {
    if formatted == doc.text() {
        return Vec::new();
    }
    vec![TextEdit {
        range: offset_range_to_lsp(doc, 0, doc.len()),
        new_text: formatted,
    }]
}

impl TreeLens {
    pub(crate) async fn formatting_impl(
        &self,
        params: DocumentFormattingParams,
    ) -> Result<Option<Vec<TextEdit>>> {
        let Some(context) = self.engine_request_context(&params.text_document.uri, "formatting")
        else {
            return Ok(None);
        };

        let formatted = match context.engine.format(context.document.text()).await {
            Ok(formatted) => formatted,
            Err(err @ EngineError::Unsupported(_)) => {
                log::debug!(target: LOG_TARGET, "formatting skipped: {}", err);
                return Ok(None);
            }
            Err(err) => {
                log::warn!(target: LOG_TARGET, "formatting failed: {}", err);
                return Ok(None);
            }
        };

        if !self.still_current(&context, "formatting") {
            return Ok(None);
        }
        Ok(formatted.map(|formatted| formatting_edits(&context.document, formatted)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_lsp_server::ls_types::{Position, Range};

    #[test]
    fn test_unchanged_text_needs_no_edit() {
        let doc = Document::new("fn main() {}\n");
        assert!(formatting_edits(&doc, "fn main() {}\n".to_string()).is_empty());
    }

    #[test]
    fn test_formatted_text_replaces_whole_document() {
        let doc = Document::new("fn main(){}\nlet  é=1;");
        let edits = formatting_edits(&doc, "fn main() {}\n".to_string());

        assert_eq!(edits.len(), 1);
        assert_eq!(
            edits[0].range,
            Range::new(Position::new(0, 0), Position::new(1, 9))
        );
        assert_eq!(edits[0].new_text, "fn main() {}\n");
    }
}
