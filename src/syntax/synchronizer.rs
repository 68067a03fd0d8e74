//! Keeps one document's concrete syntax tree in step with its text.
//!
//! The synchronizer owns the live tree. Edit batches are applied to the tree's
//! byte/row/column bookkeeping first, then the external parser reparses with
//! the edited tree as a reuse hint. A successful reparse replaces (and drops)
//! the previous tree and advances the epoch.
//!
//! # Ordering
//!
//! `apply` takes `&mut self`, and the owning session holds the document
//! exclusively for the edit + reparse + projection cycle. Batches are
//! therefore applied strictly one after another in arrival order: a batch can
//! never land on a tree that is concurrently being replaced, and no batch is
//! dropped.
//!
//! # Parser unavailable
//!
//! Without a parser (grammar not loaded yet) edits still reach the retained
//! tree, so it keeps describing the current text, but no reparse happens and
//! the caller keeps its last projection.

use log::{debug, warn};
use tree_sitter::Tree;

use super::edit::EditBatch;
use super::parser::IncrementalParser;

const LOG_TARGET: &str = "treelens::sync";

/// Why a cycle produced no new tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No parser attached yet
    ParserUnavailable,
    /// The parser gave up (cancelled or timed out)
    ParseFailed,
}

/// Result of one synchronization cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A new tree is in place; `epoch` is its generation
    Reparsed { epoch: u64 },
    /// The tree was not replaced; projections should stay as they are
    Skipped(SkipReason),
}

impl SyncOutcome {
    pub fn is_reparsed(&self) -> bool {
        matches!(self, SyncOutcome::Reparsed { .. })
    }
}

#[derive(Default)]
pub struct TreeEditSynchronizer {
    tree: Option<Tree>,
    parser: Option<Box<dyn IncrementalParser>>,
    epoch: u64,
    /// Text changed since the current tree was produced
    stale: bool,
}

impl std::fmt::Debug for TreeEditSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeEditSynchronizer")
            .field("has_tree", &self.tree.is_some())
            .field("has_parser", &self.parser.is_some())
            .field("epoch", &self.epoch)
            .field("stale", &self.stale)
            .finish()
    }
}

impl TreeEditSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parser(parser: Box<dyn IncrementalParser>) -> Self {
        Self {
            parser: Some(parser),
            ..Self::default()
        }
    }

    /// Provide the parser once it becomes available; the next cycle uses it
    pub fn attach_parser(&mut self, parser: Box<dyn IncrementalParser>) {
        self.parser = Some(parser);
    }

    /// Switch to a parser for another grammar.
    ///
    /// The live tree belongs to the old grammar, so it is dropped and the next
    /// cycle parses from scratch.
    pub fn replace_parser(&mut self, parser: Box<dyn IncrementalParser>) {
        self.parser = Some(parser);
        self.tree = None;
        self.stale = true;
    }

    pub fn has_parser(&self) -> bool {
        self.parser.is_some()
    }

    /// The live tree, if any parse has succeeded
    pub fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    /// Number of successful reparses so far
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Whether the text moved on since the live tree was produced
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Apply a batch's edits to the tree, then reparse its text
    pub fn apply(&mut self, batch: &EditBatch) -> SyncOutcome {
        if batch.is_full_replace() {
            // No edit describes a full replacement, so the tree is no hint
            self.tree = None;
        } else if let Some(tree) = self.tree.as_mut() {
            for edit in batch.edits() {
                tree.edit(edit);
            }
        }
        self.stale = true;

        self.reparse(batch.text())
    }

    /// Reparse `text`, reusing the live tree as a hint when there is one
    pub fn reparse(&mut self, text: &str) -> SyncOutcome {
        let Some(parser) = self.parser.as_mut() else {
            debug!(
                target: LOG_TARGET,
                "Parser not available; keeping last projection"
            );
            self.stale = true;
            return SyncOutcome::Skipped(SkipReason::ParserUnavailable);
        };

        match parser.parse(text, self.tree.as_ref()) {
            Some(tree) => {
                // Replacing drops the previous tree
                self.tree = Some(tree);
                self.epoch += 1;
                self.stale = false;
                debug!(target: LOG_TARGET, "Reparsed, epoch {}", self.epoch);
                SyncOutcome::Reparsed { epoch: self.epoch }
            }
            None => {
                warn!(target: LOG_TARGET, "Parser returned no tree; keeping last projection");
                self.stale = true;
                SyncOutcome::Skipped(SkipReason::ParseFailed)
            }
        }
    }
}
