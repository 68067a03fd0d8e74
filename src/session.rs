//! Per-document sessions and the manager that owns them.
//!
//! # Serialization
//!
//! Each document's session lives in one `DashMap` entry. Every mutation
//! (edit batch, reparse, projection) runs while holding that entry's write
//! guard, so batches for the same document are applied one after another in
//! the order they acquire the entry: a batch is never applied to a tree that is
//! being replaced, and no batch is dropped. Nothing is held across `.await`.

mod document;

pub use document::DocumentSession;

use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use dashmap::DashMap;
use log::{debug, info, warn};
use tree_sitter::Language;
use url::Url;

use crate::config::WorkspaceSettings;
use crate::document::Document;
use crate::error::{TreelensError, TreelensResult};
use crate::projection::Diagnostic;
use crate::syntax::{EditBatch, IncrementalParser, SyncOutcome, TextChange, TreeSitterParser};

const LOG_TARGET: &str = "treelens::session";

/// What changed for a document after a cycle, ready for publication
#[derive(Debug, Clone)]
pub struct SessionUpdate {
    /// `None` when no synchronization cycle ran (engine results only)
    pub outcome: Option<SyncOutcome>,
    /// Snapshot the diagnostics refer to
    pub document: Document,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct SessionManager {
    sessions: DashMap<Url, DocumentSession>,
    settings: ArcSwap<WorkspaceSettings>,
    language: ArcSwapOption<Language>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("sessions", &self.sessions.len())
            .field("language", &self.language.load().is_some())
            .finish()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(WorkspaceSettings::default())
    }
}

impl SessionManager {
    pub fn new(settings: WorkspaceSettings) -> Self {
        Self {
            sessions: DashMap::new(),
            settings: ArcSwap::new(Arc::new(settings)),
            language: ArcSwapOption::empty(),
        }
    }

    pub fn settings(&self) -> Arc<WorkspaceSettings> {
        self.settings.load_full()
    }

    /// Replace settings and reproject every open document under them
    pub fn apply_settings(&self, settings: WorkspaceSettings) -> Vec<(Url, SessionUpdate)> {
        let default_scope = settings.default_scope.clone();
        self.settings.store(Arc::new(settings));
        self.reparse_all(|session| session.set_default_scope(&default_scope))
    }

    pub fn has_language(&self) -> bool {
        self.language.load().is_some()
    }

    /// Switch to `language`; every open document drops its old parser and
    /// tree and is parsed from scratch
    pub fn set_language(&self, language: Language) -> Vec<(Url, SessionUpdate)> {
        self.language.store(Some(Arc::new(language)));
        info!(target: LOG_TARGET, "Grammar changed; reparsing open documents");
        self.reparse_all(|session| {
            if let Some(parser) = self.make_parser() {
                session.replace_parser(parser);
            }
        })
    }

    /// Start tracking a document and parse it if a grammar is available
    pub fn open(&self, url: Url, text: impl Into<String>, version: i32) -> SessionUpdate {
        let settings = self.settings();
        let mut session =
            DocumentSession::new(Document::with_version(text, version), &settings.default_scope);
        if let Some(parser) = self.make_parser() {
            session.attach_parser(parser);
        }
        let outcome = session.reparse(&settings.scope_map);
        let update = Self::snapshot(&session, outcome);
        self.sessions.insert(url, session);
        update
    }

    pub fn close(&self, url: &Url) -> bool {
        self.sessions.remove(url).is_some()
    }

    pub fn is_open(&self, url: &Url) -> bool {
        self.sessions.contains_key(url)
    }

    pub fn urls(&self) -> Vec<Url> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Apply a host batch (offsets relative to the current text) as `version`
    pub fn apply_changes(
        &self,
        url: &Url,
        changes: &[TextChange],
        version: i32,
    ) -> TreelensResult<SessionUpdate> {
        self.edit(url, version, |doc| {
            EditBatch::from_changes(doc, changes).map_err(TreelensError::from)
        })
    }

    /// Apply a batch built against the current text by `build`.
    ///
    /// `build` runs under the document's exclusive entry, so the text it sees
    /// is exactly the text the batch will be applied to.
    pub fn edit<F>(&self, url: &Url, version: i32, build: F) -> TreelensResult<SessionUpdate>
    where
        F: FnOnce(&Document) -> TreelensResult<EditBatch>,
    {
        let settings = self.settings();
        let mut session = self
            .sessions
            .get_mut(url)
            .ok_or_else(|| TreelensError::document_not_found(url.as_str()))?;

        let batch = build(session.document())?;
        if session.document().version() > version {
            debug!(
                target: LOG_TARGET,
                "Applying version {} over newer {} for {}",
                version,
                session.document().version(),
                url
            );
        }
        let outcome = session.apply(&batch, version, &settings.scope_map);
        Ok(Self::snapshot(&session, outcome))
    }

    /// Read a session without blocking other documents
    pub fn with_session<R>(&self, url: &Url, f: impl FnOnce(&DocumentSession) -> R) -> Option<R> {
        self.sessions.get(url).map(|session| f(&session))
    }

    pub fn document(&self, url: &Url) -> Option<Document> {
        self.with_session(url, |session| session.document().clone())
    }

    pub fn version(&self, url: &Url) -> Option<i32> {
        self.with_session(url, DocumentSession::version)
    }

    /// Whether `url` is still open at `version`; results computed for an
    /// older version must not be applied
    pub fn is_current(&self, url: &Url, version: i32) -> bool {
        self.version(url) == Some(version)
    }

    /// Store engine diagnostics computed for `version`.
    ///
    /// Returns the update to publish, or `None` when the document moved on
    /// (or closed) while the engine was working.
    pub fn set_engine_diagnostics(
        &self,
        url: &Url,
        version: i32,
        diagnostics: Vec<Diagnostic>,
    ) -> Option<SessionUpdate> {
        let mut session = self.sessions.get_mut(url)?;
        if session.version() != version {
            debug!(
                target: LOG_TARGET,
                "Dropping engine diagnostics for stale version {} of {}",
                version,
                url
            );
            return None;
        }
        session.set_engine_diagnostics(diagnostics);
        Some(Self::snapshot(&session, None::<SyncOutcome>))
    }

    fn make_parser(&self) -> Option<Box<dyn IncrementalParser>> {
        let language = self.language.load_full()?;
        match TreeSitterParser::new(&language) {
            Ok(parser) => Some(Box::new(parser)),
            Err(e) => {
                warn!(target: LOG_TARGET, "Cannot create parser: {}", e);
                None
            }
        }
    }

    fn reparse_all(&self, mut prepare: impl FnMut(&mut DocumentSession)) -> Vec<(Url, SessionUpdate)> {
        let settings = self.settings();
        let mut updates = Vec::new();
        for mut entry in self.sessions.iter_mut() {
            prepare(entry.value_mut());
            let outcome = entry.value_mut().reparse(&settings.scope_map);
            updates.push((entry.key().clone(), Self::snapshot(entry.value(), outcome)));
        }
        updates
    }

    fn snapshot(session: &DocumentSession, outcome: impl Into<Option<SyncOutcome>>) -> SessionUpdate {
        SessionUpdate {
            outcome: outcome.into(),
            document: session.document().clone(),
            diagnostics: session.diagnostics(),
        }
    }
}
