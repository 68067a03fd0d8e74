use log::debug;

use crate::document::Document;
use crate::projection::{
    Diagnostic, ScopeMap, TokenizationStateAdapter, build_tokens, collect_diagnostics,
    sort_diagnostics,
};
use crate::syntax::{EditBatch, IncrementalParser, SyncOutcome, TreeEditSynchronizer};

const LOG_TARGET: &str = "treelens::session";

/// Everything treelens knows about one open document.
///
/// The session owns the live tree through its synchronizer; token lines and
/// structural diagnostics are the projection of the last successful reparse.
/// Diagnostics are only reported for the text they were computed on.
#[derive(Debug)]
pub struct DocumentSession {
    document: Document,
    /// Bumped whenever the text changes
    revision: u64,
    sync: TreeEditSynchronizer,
    tokens: TokenizationStateAdapter,
    diagnostics: Vec<Diagnostic>,
    /// Revision `diagnostics` were collected at
    diagnostics_revision: Option<u64>,
    engine_diagnostics: Vec<Diagnostic>,
}

impl DocumentSession {
    pub fn new(document: Document, default_scope: &str) -> Self {
        Self {
            document,
            revision: 0,
            sync: TreeEditSynchronizer::new(),
            tokens: TokenizationStateAdapter::new(default_scope),
            diagnostics: Vec::new(),
            diagnostics_revision: None,
            engine_diagnostics: Vec::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn version(&self) -> i32 {
        self.document.version()
    }

    pub fn synchronizer(&self) -> &TreeEditSynchronizer {
        &self.sync
    }

    pub fn tokens(&self) -> &TokenizationStateAdapter {
        &self.tokens
    }

    pub fn has_parser(&self) -> bool {
        self.sync.has_parser()
    }

    /// Apply one batch as `version`, then reproject if the tree was replaced
    pub fn apply(
        &mut self,
        batch: &EditBatch,
        version: i32,
        scope_map: &ScopeMap,
    ) -> SyncOutcome {
        self.document = Document::with_version(batch.text(), version);
        self.revision += 1;
        // Computed for the previous text
        self.engine_diagnostics.clear();
        let outcome = self.sync.apply(batch);
        self.after_sync(outcome, scope_map)
    }

    /// Parse the current text from scratch with the tree as hint, if any
    pub fn reparse(&mut self, scope_map: &ScopeMap) -> SyncOutcome {
        let outcome = self.sync.reparse(self.document.text());
        self.after_sync(outcome, scope_map)
    }

    pub fn attach_parser(&mut self, parser: Box<dyn IncrementalParser>) {
        self.sync.attach_parser(parser);
    }

    /// Parse with a different grammar from now on; the next reparse is a full one
    pub fn replace_parser(&mut self, parser: Box<dyn IncrementalParser>) {
        self.sync.replace_parser(parser);
    }

    pub fn set_default_scope(&mut self, scope: &str) {
        self.tokens.set_default_scope(scope);
    }

    /// Engine-reported diagnostics for the current version; replaces the previous set
    pub fn set_engine_diagnostics(&mut self, diagnostics: Vec<Diagnostic>) {
        self.engine_diagnostics = diagnostics;
    }

    /// Structural and engine diagnostics together, sorted by span start.
    ///
    /// After a skipped cycle the structural set describes older text and is
    /// left out until the next successful reparse.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let structural: &[Diagnostic] = if self.diagnostics_revision == Some(self.revision) {
            &self.diagnostics
        } else {
            &[]
        };
        let mut all: Vec<Diagnostic> = structural
            .iter()
            .chain(&self.engine_diagnostics)
            .cloned()
            .collect();
        sort_diagnostics(&mut all);
        all
    }

    fn after_sync(&mut self, outcome: SyncOutcome, scope_map: &ScopeMap) -> SyncOutcome {
        if outcome.is_reparsed() {
            self.project(scope_map);
        } else {
            debug!(
                target: LOG_TARGET,
                "Projection kept at epoch {} ({:?})",
                self.tokens.epoch(),
                outcome
            );
        }
        outcome
    }

    fn project(&mut self, scope_map: &ScopeMap) {
        let Some(tree) = self.sync.tree() else {
            return;
        };
        let root = tree.root_node();
        let lines = build_tokens(root, &self.document, scope_map, self.tokens.default_scope());
        self.diagnostics = collect_diagnostics(root, &self.document);
        self.diagnostics_revision = Some(self.revision);
        self.tokens.replace_lines(lines);
    }
}
