use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Node kind → scope label, e.g. `"string_literal" = "string"`.
///
/// Scope labels are `type[.modifier...]` names; see
/// [`crate::lsp::semantic_tokens`] for how they reach the client.
pub type ScopeMapping = HashMap<String, String>;

/// Which grammar to load and from where
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Path to the grammar's shared library
    pub library: Option<String>,
    /// Language name; the constructor symbol defaults to `tree_sitter_<language>`
    pub language: Option<String>,
    /// Explicit constructor symbol
    pub symbol: Option<String>,
}

/// How to start the analysis engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Program followed by its arguments
    pub cmd: Option<Vec<String>>,
    /// Per-request timeout in milliseconds
    pub timeout_ms: Option<u64>,
}

/// One configuration layer as written in `treelens.toml` or sent as
/// `initializationOptions`. Every field is optional so layers can be merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreelensSettings {
    pub default_scope: Option<String>,
    #[serde(default)]
    pub scopes: ScopeMapping,
    pub parser: Option<ParserConfig>,
    pub engine: Option<EngineConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_layer() {
        let settings: TreelensSettings = toml::from_str(
            r#"
            defaultScope = "text"

            [scopes]
            string_literal = "string"
            line_comment = "comment"

            [parser]
            library = "/opt/grammars/rust.so"
            language = "rust"

            [engine]
            cmd = ["my-engine", "--stdio"]
            timeoutMs = 2500
            "#,
        )
        .unwrap();

        assert_eq!(settings.default_scope.as_deref(), Some("text"));
        assert_eq!(settings.scopes["string_literal"], "string");
        let parser = settings.parser.unwrap();
        assert_eq!(parser.language.as_deref(), Some("rust"));
        assert_eq!(parser.symbol, None);
        let engine = settings.engine.unwrap();
        assert_eq!(engine.cmd.unwrap(), vec!["my-engine", "--stdio"]);
        assert_eq!(engine.timeout_ms, Some(2500));
    }

    #[test]
    fn test_parse_json_layer() {
        let settings: TreelensSettings = serde_json::from_value(serde_json::json!({
            "scopes": {"identifier": "variable"},
            "engine": {"timeoutMs": 10}
        }))
        .unwrap();
        assert_eq!(settings.default_scope, None);
        assert_eq!(settings.scopes["identifier"], "variable");
        assert_eq!(settings.engine.unwrap().cmd, None);
    }

    #[test]
    fn test_empty_layer() {
        let settings: TreelensSettings = toml::from_str("").unwrap();
        assert_eq!(settings, TreelensSettings::default());
    }
}
