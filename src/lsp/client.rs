//! Outgoing traffic to the editor: log messages, diagnostics and refresh requests.

use std::sync::OnceLock;

use tower_lsp_server::Client;
use tower_lsp_server::ls_types::{
    ClientCapabilities, Diagnostic, DiagnosticSeverity, MessageType, NumberOrString,
    SemanticTokensWorkspaceClientCapabilities, Uri,
};
use url::Url;

use crate::document::{Document, span_to_lsp_range};
use crate::projection::{Diagnostic as SyntaxDiagnostic, Severity};
use crate::session::SessionUpdate;

use super::lsp_impl::url_to_uri;
use super::{SettingsEvent, SettingsEventKind};

const LOG_TARGET: &str = "treelens::lsp";

/// Whether the editor asked to be told when semantic tokens go stale
pub(crate) fn refresh_supported(caps: &ClientCapabilities) -> bool {
    matches!(
        caps.workspace
            .as_ref()
            .and_then(|workspace| workspace.semantic_tokens.as_ref()),
        Some(SemanticTokensWorkspaceClientCapabilities {
            refresh_support: Some(true),
            ..
        })
    )
}

/// LSP form of a diagnostic, located in the document it was computed for
pub(crate) fn to_lsp_diagnostic(doc: &Document, diagnostic: &SyntaxDiagnostic) -> Diagnostic {
    let severity = match diagnostic.severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
        Severity::Information => DiagnosticSeverity::INFORMATION,
        Severity::Hint => DiagnosticSeverity::HINT,
    };
    Diagnostic {
        range: span_to_lsp_range(doc, diagnostic.span),
        severity: Some(severity),
        code: Some(NumberOrString::String(diagnostic.code.as_str().to_string())),
        source: Some(diagnostic.source.to_string()),
        message: diagnostic.message.clone(),
        ..Default::default()
    }
}

/// The editor connection together with what it declared at `initialize`
pub(crate) struct EditorLink<'a> {
    client: &'a Client,
    declared: &'a OnceLock<ClientCapabilities>,
}

impl<'a> EditorLink<'a> {
    pub(crate) fn new(client: &'a Client, declared: &'a OnceLock<ClientCapabilities>) -> Self {
        Self { client, declared }
    }

    pub(crate) async fn show_log(&self, level: MessageType, text: impl Into<String>) {
        self.client.log_message(level, text.into()).await;
    }

    pub(crate) async fn info(&self, text: impl Into<String>) {
        self.show_log(MessageType::INFO, text).await;
    }

    pub(crate) async fn warn(&self, text: impl Into<String>) {
        self.show_log(MessageType::WARNING, text).await;
    }

    pub(crate) async fn forward_settings_events(&self, events: &[SettingsEvent]) {
        for SettingsEvent { kind, message } in events {
            let level = match kind {
                SettingsEventKind::Info => MessageType::INFO,
                SettingsEventKind::Warning => MessageType::WARNING,
            };
            self.show_log(level, message.as_str()).await;
        }
    }

    /// Ask the editor to pull semantic tokens again.
    ///
    /// Runs detached: the reply carries nothing and some editors never send it.
    pub(crate) fn refresh_semantic_tokens(&self) {
        if !self.declared.get().is_some_and(refresh_supported) {
            log::debug!(target: LOG_TARGET, "Editor did not declare semantic tokens refresh");
            return;
        }

        let client = self.client.clone();
        tokio::spawn(async move {
            if let Err(err) = client.semantic_tokens_refresh().await {
                log::debug!(target: LOG_TARGET, "semantic_tokens_refresh failed: {}", err);
            }
        });
    }

    /// Replace the editor's diagnostics for `url` with those of `update`
    pub(crate) async fn publish(&self, url: &Url, update: &SessionUpdate) {
        let Some(uri) = url_to_uri(url) else {
            log::warn!(target: LOG_TARGET, "Cannot publish diagnostics for {}", url);
            return;
        };
        let diagnostics = update
            .diagnostics
            .iter()
            .map(|diagnostic| to_lsp_diagnostic(&update.document, diagnostic))
            .collect();
        self.client
            .publish_diagnostics(uri, diagnostics, Some(update.document.version()))
            .await;
    }

    pub(crate) async fn clear_diagnostics(&self, uri: Uri) {
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }
}
