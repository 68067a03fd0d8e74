//! Semantic tokens methods for TreeLens.

use tower_lsp_server::jsonrpc::Result;
use tower_lsp_server::ls_types::{
    SemanticTokens, SemanticTokensDeltaParams, SemanticTokensFullDeltaResult,
    SemanticTokensParams, SemanticTokensResult, Uri,
};
use url::Url;

use crate::lsp::semantic_tokens::{encode_tokens, fresh_result_id};

use super::super::{LOG_TARGET, TreeLens, uri_to_url};

impl TreeLens {
    /// Encode the session's current token lines under a fresh result id
    fn current_semantic_tokens(&self, lsp_uri: &Uri) -> Option<(Url, SemanticTokens)> {
        let Ok(uri) = uri_to_url(lsp_uri) else {
            log::warn!(target: LOG_TARGET, "Invalid URI in semanticTokens: {}", lsp_uri.as_str());
            return None;
        };
        let tokens = self.sessions.with_session(&uri, |session| {
            encode_tokens(session.document(), session.tokens(), Some(fresh_result_id()))
        })?;
        Some((uri, tokens))
    }

    pub(crate) async fn semantic_tokens_full_impl(
        &self,
        params: SemanticTokensParams,
    ) -> Result<Option<SemanticTokensResult>> {
        let Some((uri, tokens)) = self.current_semantic_tokens(&params.text_document.uri) else {
            return Ok(None);
        };
        self.semantic_cache.record(uri, tokens.clone());
        Ok(Some(SemanticTokensResult::Tokens(tokens)))
    }

    pub(crate) async fn semantic_tokens_full_delta_impl(
        &self,
        params: SemanticTokensDeltaParams,
    ) -> Result<Option<SemanticTokensFullDeltaResult>> {
        let Some((uri, tokens)) = self.current_semantic_tokens(&params.text_document.uri) else {
            return Ok(None);
        };
        Ok(Some(self.semantic_cache.answer_delta(
            uri,
            tokens,
            &params.previous_result_id,
        )))
    }
}
