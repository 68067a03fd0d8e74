mod client;
mod lsp_impl;
pub mod semantic_tokens;
mod settings;
mod text_sync;

pub use lsp_impl::TreeLens;
pub use settings::{
    SettingsEvent, SettingsEventKind, SettingsLoadOutcome, SettingsSource, load_settings,
};
