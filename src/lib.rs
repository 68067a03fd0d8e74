//! Incremental tree-sitter synchronization and editor projection.
//!
//! Host edits flow through [`syntax`] into a live tree; [`projection`] turns
//! the tree into per-line highlighting tokens and structural diagnostics;
//! [`engine`] and [`adapter`] bring an external analysis engine's hover,
//! completion, evaluation and formatting to the editor. [`session`] ties one
//! document's state together and [`lsp`] serves it all.

pub mod adapter;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod lsp;
pub mod projection;
pub mod session;
pub mod syntax;

pub use lsp::TreeLens;
