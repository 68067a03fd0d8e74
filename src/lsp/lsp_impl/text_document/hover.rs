//! Hover method for TreeLens.

use tower_lsp_server::jsonrpc::Result;
use tower_lsp_server::ls_types::{Hover, HoverParams};

use crate::adapter;
use crate::document::{lsp_position_to_offset, offset_to_position};

use super::super::TreeLens;

impl TreeLens {
    pub(crate) async fn hover_impl(&self, params: HoverParams) -> Result<Option<Hover>> {
        let lsp_uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let Some(context) = self.engine_request_context(&lsp_uri, "hover") else {
            return Ok(None);
        };
        let doc = &context.document;
        let position = offset_to_position(doc, lsp_position_to_offset(doc, position));

        let hover = adapter::hover(&context.engine, doc, position).await;
        if !self.still_current(&context, "hover") {
            return Ok(None);
        }
        Ok(hover)
    }
}
