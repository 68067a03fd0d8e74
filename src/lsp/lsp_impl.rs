mod text_document;

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tower_lsp_server::jsonrpc::Result;
use tower_lsp_server::ls_types::*;
use tower_lsp_server::{Client, LanguageServer};
use url::Url;

use crate::config::{GrammarSource, WorkspaceSettings};
use crate::engine::EngineHandle;
use crate::error::EngineError;
use crate::projection::Diagnostic as StructuralDiagnostic;
use crate::session::{SessionManager, SessionUpdate};
use crate::syntax::ParserLoader;

use super::client::EditorLink;
use super::semantic_tokens::{SemanticTokenCache, legend};
use super::settings::{SettingsSource, load_settings};
use super::text_sync::content_changes_to_batch;

const LOG_TARGET: &str = "treelens::lsp";

/// Convert an LSP URI into the `url::Url` sessions are keyed by
pub(crate) fn uri_to_url(uri: &Uri) -> std::result::Result<Url, url::ParseError> {
    Url::parse(uri.as_str())
}

/// Convert a session key back into an LSP URI
pub(crate) fn url_to_uri(url: &Url) -> Option<Uri> {
    Uri::from_str(url.as_str()).ok()
}

/// Grammar loading state: the loader keeps libraries alive for the languages it returned
#[derive(Default)]
struct GrammarState {
    loader: ParserLoader,
    current: Option<GrammarSource>,
}

pub struct TreeLens {
    client: Client,
    sessions: SessionManager,
    semantic_cache: SemanticTokenCache,
    root_path: OnceLock<PathBuf>,
    client_capabilities: OnceLock<ClientCapabilities>,
    grammar: Mutex<GrammarState>,
    engine: ArcSwapOption<EngineHandle>,
    /// Command and timeout the current engine was started with
    engine_command: Mutex<Option<(Vec<String>, Duration)>>,
}

impl std::fmt::Debug for TreeLens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeLens")
            .field("client", &self.client)
            .field("sessions", &self.sessions)
            .field("engine", &self.engine.load().is_some())
            .finish_non_exhaustive()
    }
}

impl TreeLens {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            sessions: SessionManager::default(),
            semantic_cache: SemanticTokenCache::new(),
            root_path: OnceLock::new(),
            client_capabilities: OnceLock::new(),
            grammar: Mutex::new(GrammarState::default()),
            engine: ArcSwapOption::empty(),
            engine_command: Mutex::new(None),
        }
    }

    fn link(&self) -> EditorLink<'_> {
        EditorLink::new(&self.client, &self.client_capabilities)
    }

    /// The running engine, unless none is configured or its connection is gone
    pub(crate) fn engine(&self) -> Option<Arc<EngineHandle>> {
        self.engine.load_full().filter(|engine| !engine.is_closed())
    }

    /// Load layered settings and reproject every open document under them
    async fn reload_settings(&self, override_settings: Option<(SettingsSource, serde_json::Value)>) {
        let outcome = load_settings(
            self.root_path.get().map(PathBuf::as_path),
            override_settings,
        );
        self.link().forward_settings_events(&outcome.events).await;

        let updates = self.sessions.apply_settings(outcome.settings);
        self.publish_updates(updates).await;
    }

    /// Bring the grammar and the engine in line with the current settings
    async fn sync_backends(&self) {
        let settings = self.sessions.settings();
        self.sync_grammar(&settings).await;
        self.sync_engine(&settings).await;
        self.link().refresh_semantic_tokens();
    }

    async fn sync_grammar(&self, settings: &WorkspaceSettings) {
        let loaded = {
            let mut state = self.grammar.lock().unwrap_or_else(PoisonError::into_inner);
            let Some(source) = settings.grammar.as_ref() else {
                return;
            };
            if state.current.as_ref() == Some(source) {
                return;
            }
            let library = source.library.to_string_lossy();
            let result =
                state
                    .loader
                    .load_language(&library, &source.language, source.symbol.as_deref());
            if result.is_ok() {
                state.current = Some(source.clone());
            }
            result.map(|language| (language, source.clone()))
        };

        match loaded {
            Ok((language, source)) => {
                self.link()
                    .info(format!(
                        "Loaded {} grammar from {}",
                        source.language,
                        source.library.display()
                    ))
                    .await;
                let updates = self.sessions.set_language(language);
                self.publish_updates(updates).await;
            }
            Err(err) => {
                log::warn!(target: LOG_TARGET, "Grammar unavailable: {}", err);
                self.link()
                    .warn(format!("Failed to load grammar: {}", err))
                    .await;
            }
        }
    }

    async fn sync_engine(&self, settings: &WorkspaceSettings) {
        let wanted = settings
            .engine_cmd
            .clone()
            .map(|cmd| (cmd, settings.engine_timeout));
        {
            let mut current = self
                .engine_command
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if *current == wanted && (wanted.is_none() || self.engine().is_some()) {
                return;
            }
            current.clone_from(&wanted);
        }

        // Dropping the old handle closes its connection and kills the process
        self.engine.store(None);
        let Some((cmd, timeout)) = wanted else {
            return;
        };

        match EngineHandle::spawn(&cmd, timeout).await {
            Ok(engine) => {
                self.link()
                    .info(format!(
                        "Engine `{}` started ({:?})",
                        cmd.join(" "),
                        engine.capabilities()
                    ))
                    .await;
                self.engine.store(Some(Arc::new(engine)));
            }
            Err(err) => {
                log::warn!(target: LOG_TARGET, "Engine unavailable: {}", err);
                self.link()
                    .warn(format!("Failed to start engine: {}", err))
                    .await;
            }
        }
    }

    async fn publish_updates(&self, updates: Vec<(Url, SessionUpdate)>) {
        for (url, update) in updates {
            self.link().publish(&url, &update).await;
        }
    }

    /// Run the engine over the saved text and publish its verdict as diagnostics
    async fn evaluate_on_save(&self, url: Url) {
        let Some(engine) = self.engine() else {
            return;
        };
        let Some(doc) = self.sessions.document(&url) else {
            return;
        };

        let engine_diagnostics = match engine.evaluate(doc.text()).await {
            Ok(result) => {
                log::debug!(target: LOG_TARGET, "evaluate {}: {:?}", url, result);
                Vec::new()
            }
            Err(EngineError::Remote { message, span }) => {
                vec![StructuralDiagnostic::from_engine_error(message, span)]
            }
            Err(err @ EngineError::Unsupported(_)) => {
                log::debug!(target: LOG_TARGET, "evaluate skipped: {}", err);
                return;
            }
            Err(err) => {
                log::warn!(target: LOG_TARGET, "evaluate failed for {}: {}", url, err);
                return;
            }
        };

        match self
            .sessions
            .set_engine_diagnostics(&url, doc.version(), engine_diagnostics)
        {
            Some(update) => self.link().publish(&url, &update).await,
            None => log::debug!(
                target: LOG_TARGET,
                "Dropped evaluate result for {} version {}",
                url,
                doc.version()
            ),
        }
    }
}

/// Workspace root from folders, then the deprecated root URI, then the working directory
fn resolve_root_path(params: &InitializeParams) -> Option<PathBuf> {
    let from_uri = |uri: &Uri| uri_to_url(uri).ok()?.to_file_path().ok();

    if let Some(folders) = &params.workspace_folders {
        return folders.first().and_then(|folder| from_uri(&folder.uri));
    }
    #[allow(deprecated)]
    let root_uri = params.root_uri.as_ref();
    if let Some(root_uri) = root_uri {
        return from_uri(root_uri);
    }
    std::env::current_dir().ok()
}

impl LanguageServer for TreeLens {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let _ = self.client_capabilities.set(params.capabilities.clone());

        match resolve_root_path(&params) {
            Some(path) => {
                self.link()
                    .info(format!("Using workspace root {}", path.display()))
                    .await;
                let _ = self.root_path.set(path);
            }
            None => {
                self.link()
                    .warn("Failed to determine workspace root - project config will not be loaded")
                    .await;
            }
        }

        let override_settings = params
            .initialization_options
            .map(|options| (SettingsSource::InitializationOptions, options));
        self.reload_settings(override_settings).await;

        Ok(InitializeResult {
            server_info: Some(ServerInfo {
                name: "treelens".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::INCREMENTAL),
                        will_save: None,
                        will_save_wait_until: None,
                        save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                            include_text: Some(false),
                        })),
                    },
                )),
                semantic_tokens_provider: Some(
                    SemanticTokensServerCapabilities::SemanticTokensOptions(
                        SemanticTokensOptions {
                            legend: legend(),
                            full: Some(SemanticTokensFullOptions::Delta { delta: Some(true) }),
                            range: None,
                            ..Default::default()
                        },
                    ),
                ),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                completion_provider: Some(CompletionOptions::default()),
                document_formatting_provider: Some(OneOf::Left(true)),
                ..ServerCapabilities::default()
            },
            offset_encoding: None,
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.sync_backends().await;
        self.link().info("server is ready").await;
    }

    async fn shutdown(&self) -> Result<()> {
        self.engine.store(None);
        Ok(())
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        self.reload_settings(Some((SettingsSource::ClientConfiguration, params.settings)))
            .await;
        self.sync_backends().await;
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let Ok(url) = uri_to_url(&params.text_document.uri) else {
            log::warn!(
                target: LOG_TARGET,
                "Invalid URI in didOpen: {}",
                params.text_document.uri.as_str()
            );
            return;
        };

        let update = self.sessions.open(
            url.clone(),
            params.text_document.text,
            params.text_document.version,
        );
        self.link().publish(&url, &update).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let Ok(url) = uri_to_url(&params.text_document.uri) else {
            return;
        };
        let changes = params.content_changes;

        let result = self.sessions.edit(&url, params.text_document.version, move |doc| {
            Ok(content_changes_to_batch(doc, changes)?)
        });
        match result {
            Ok(update) => self.link().publish(&url, &update).await,
            Err(err) => {
                log::warn!(target: LOG_TARGET, "didChange rejected for {}: {}", url, err);
                self.link()
                    .warn(format!("Change rejected: {}", err))
                    .await;
            }
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let Ok(url) = uri_to_url(&params.text_document.uri) else {
            return;
        };
        self.evaluate_on_save(url).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        let Ok(url) = uri_to_url(&uri) else {
            return;
        };

        self.sessions.close(&url);
        self.semantic_cache.forget(&url);
        self.link().clear_diagnostics(uri).await;
    }

    async fn semantic_tokens_full(
        &self,
        params: SemanticTokensParams,
    ) -> Result<Option<SemanticTokensResult>> {
        self.semantic_tokens_full_impl(params).await
    }

    async fn semantic_tokens_full_delta(
        &self,
        params: SemanticTokensDeltaParams,
    ) -> Result<Option<SemanticTokensFullDeltaResult>> {
        self.semantic_tokens_full_delta_impl(params).await
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        self.hover_impl(params).await
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        self.completion_impl(params).await
    }

    async fn formatting(&self, params: DocumentFormattingParams) -> Result<Option<Vec<TextEdit>>> {
        self.formatting_impl(params).await
    }
}
