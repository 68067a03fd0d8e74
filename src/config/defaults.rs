//! Programmed defaults, the lowest configuration layer.

use super::settings::{EngineConfig, ScopeMapping, TreelensSettings};

/// Scope of text no mapped node covers
pub const DEFAULT_SCOPE: &str = "text";

/// Engine request timeout when no layer sets one
pub const DEFAULT_ENGINE_TIMEOUT_MS: u64 = 5000;

pub fn default_settings() -> TreelensSettings {
    TreelensSettings {
        default_scope: Some(DEFAULT_SCOPE.to_string()),
        scopes: default_scopes(),
        parser: None,
        engine: Some(EngineConfig {
            cmd: None,
            timeout_ms: Some(DEFAULT_ENGINE_TIMEOUT_MS),
        }),
    }
}

/// Node kinds shared by many tree-sitter grammars, mapped to scope labels
pub fn default_scopes() -> ScopeMapping {
    let pairs = [
        // Comments
        ("comment", "comment"),
        ("line_comment", "comment"),
        ("block_comment", "comment"),
        ("doc_comment", "comment.documentation"),
        // Strings
        ("string", "string"),
        ("string_literal", "string"),
        ("raw_string_literal", "string"),
        ("char_literal", "string"),
        ("template_string", "string"),
        ("escape_sequence", "string"),
        ("regex", "regexp"),
        // Literals
        ("number", "number"),
        ("integer", "number"),
        ("float", "number"),
        ("integer_literal", "number"),
        ("float_literal", "number"),
        ("boolean_literal", "keyword"),
        ("true", "keyword"),
        ("false", "keyword"),
        ("null", "keyword"),
        ("nil", "keyword"),
        // Identifiers
        ("identifier", "variable"),
        ("field_identifier", "property"),
        ("property_identifier", "property"),
        ("shorthand_field_identifier", "property"),
        ("type_identifier", "type"),
        ("primitive_type", "type.defaultLibrary"),
        ("predefined_type", "type.defaultLibrary"),
        ("self", "variable.defaultLibrary"),
        ("lifetime", "typeParameter"),
        ("attribute_item", "decorator"),
        ("decorator", "decorator"),
        ("macro_invocation", "macro"),
        // Keywords
        ("fn", "keyword"),
        ("function", "keyword"),
        ("def", "keyword"),
        ("let", "keyword"),
        ("const", "keyword"),
        ("var", "keyword"),
        ("mut", "keyword"),
        ("pub", "keyword"),
        ("use", "keyword"),
        ("import", "keyword"),
        ("from", "keyword"),
        ("mod", "keyword"),
        ("struct", "keyword"),
        ("enum", "keyword"),
        ("impl", "keyword"),
        ("trait", "keyword"),
        ("type", "keyword"),
        ("class", "keyword"),
        ("if", "keyword"),
        ("else", "keyword"),
        ("match", "keyword"),
        ("for", "keyword"),
        ("while", "keyword"),
        ("loop", "keyword"),
        ("in", "keyword"),
        ("return", "keyword"),
        ("break", "keyword"),
        ("continue", "keyword"),
        ("async", "keyword"),
        ("await", "keyword"),
        ("where", "keyword"),
        ("as", "keyword"),
    ];

    pairs
        .into_iter()
        .map(|(kind, scope)| (kind.to_string(), scope.to_string()))
        .collect()
}
