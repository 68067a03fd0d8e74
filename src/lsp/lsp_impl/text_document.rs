//! Text document related LSP methods.

mod completion;
mod formatting;
mod hover;
mod semantic_tokens;

use std::sync::Arc;

use tower_lsp_server::ls_types::Uri;
use url::Url;

use crate::document::Document;
use crate::engine::EngineHandle;

use super::{LOG_TARGET, TreeLens, uri_to_url};

/// What an engine-backed request needs: the session key, a snapshot and the engine
pub(crate) struct EngineRequestContext {
    pub(crate) uri: Url,
    pub(crate) document: Document,
    pub(crate) engine: Arc<EngineHandle>,
}

impl TreeLens {
    /// Shared preamble for engine-backed requests.
    ///
    /// Returns `None` for an invalid URI, an unknown document or no running engine.
    pub(crate) fn engine_request_context(
        &self,
        lsp_uri: &Uri,
        method_name: &str,
    ) -> Option<EngineRequestContext> {
        let Ok(uri) = uri_to_url(lsp_uri) else {
            log::warn!(target: LOG_TARGET, "Invalid URI in {}: {}", method_name, lsp_uri.as_str());
            return None;
        };
        let engine = self.engine()?;
        let Some(document) = self.sessions.document(&uri) else {
            log::debug!(target: LOG_TARGET, "{}: no document for {}", method_name, uri);
            return None;
        };
        Some(EngineRequestContext {
            uri,
            document,
            engine,
        })
    }

    /// Whether a result computed against `context` may still be returned
    pub(crate) fn still_current(&self, context: &EngineRequestContext, method_name: &str) -> bool {
        let current = self
            .sessions
            .is_current(&context.uri, context.document.version());
        if !current {
            log::debug!(
                target: LOG_TARGET,
                "{}: dropping result for {} version {}",
                method_name,
                context.uri,
                context.document.version()
            );
        }
        current
    }
}
