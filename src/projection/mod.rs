pub mod diagnostics;
pub mod tokenization;
pub mod tokens;

// Re-export main types
pub use diagnostics::{
    Diagnostic, DiagnosticCode, ENGINE_SOURCE, SYNTAX_SOURCE, Severity, collect_diagnostics,
    sort_diagnostics,
};
pub use tokenization::{LineTokens, TokenizationState, TokenizationStateAdapter};
pub use tokens::{ScopeMap, Token, TokenLine, build_tokens};
