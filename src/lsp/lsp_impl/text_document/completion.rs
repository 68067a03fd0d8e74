//! Completion method for TreeLens.

use tower_lsp_server::jsonrpc::Result;
use tower_lsp_server::ls_types::{CompletionParams, CompletionResponse};

use crate::adapter;
use crate::document::{lsp_position_to_offset, offset_to_position};

use super::super::TreeLens;

impl TreeLens {
    pub(crate) async fn completion_impl(
        &self,
        params: CompletionParams,
    ) -> Result<Option<CompletionResponse>> {
        let lsp_uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let Some(context) = self.engine_request_context(&lsp_uri, "completion") else {
            return Ok(None);
        };
        let doc = &context.document;
        let position = offset_to_position(doc, lsp_position_to_offset(doc, position));

        let items = adapter::completions(&context.engine, doc, position).await;
        if !self.still_current(&context, "completion") {
            return Ok(None);
        }
        Ok(Some(CompletionResponse::Array(items)))
    }
}
