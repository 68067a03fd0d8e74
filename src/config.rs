pub mod defaults;
pub mod settings;
pub mod user;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub use settings::{EngineConfig, ParserConfig, ScopeMapping, TreelensSettings};
pub use user::{UserConfigResult, load_config_file, load_user_config, user_config_path};

use crate::projection::ScopeMap;

/// Merge layers in order; later layers take precedence over earlier ones
pub fn merge_all(configs: &[Option<TreelensSettings>]) -> Option<TreelensSettings> {
    configs.iter().cloned().reduce(merge_settings).flatten()
}

/// Merge two layers, preferring values from `primary` over `fallback`
pub fn merge_settings(
    fallback: Option<TreelensSettings>,
    primary: Option<TreelensSettings>,
) -> Option<TreelensSettings> {
    match (fallback, primary) {
        (None, None) => None,
        (Some(settings), None) | (None, Some(settings)) => Some(settings),
        (Some(fallback), Some(primary)) => {
            // Scope entries merge per node kind
            let mut scopes = fallback.scopes;
            scopes.extend(primary.scopes);

            Some(TreelensSettings {
                default_scope: primary.default_scope.or(fallback.default_scope),
                scopes,
                parser: merge_parser(fallback.parser, primary.parser),
                engine: merge_engine(fallback.engine, primary.engine),
            })
        }
    }
}

fn merge_parser(fallback: Option<ParserConfig>, primary: Option<ParserConfig>) -> Option<ParserConfig> {
    match (fallback, primary) {
        (Some(fallback), Some(primary)) => Some(ParserConfig {
            library: primary.library.or(fallback.library),
            language: primary.language.or(fallback.language),
            symbol: primary.symbol.or(fallback.symbol),
        }),
        (fallback, primary) => primary.or(fallback),
    }
}

fn merge_engine(fallback: Option<EngineConfig>, primary: Option<EngineConfig>) -> Option<EngineConfig> {
    match (fallback, primary) {
        (Some(fallback), Some(primary)) => Some(EngineConfig {
            cmd: primary.cmd.or(fallback.cmd),
            timeout_ms: primary.timeout_ms.or(fallback.timeout_ms),
        }),
        (fallback, primary) => primary.or(fallback),
    }
}

/// Grammar to load, once library and language are both known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarSource {
    pub library: PathBuf,
    pub language: String,
    pub symbol: Option<String>,
}

/// Settings after merging, with defaults filled in
#[derive(Debug, Clone)]
pub struct WorkspaceSettings {
    pub default_scope: Arc<str>,
    pub scope_map: ScopeMap,
    pub grammar: Option<GrammarSource>,
    pub engine_cmd: Option<Vec<String>>,
    pub engine_timeout: Duration,
}

impl From<TreelensSettings> for WorkspaceSettings {
    fn from(settings: TreelensSettings) -> Self {
        let grammar = settings.parser.and_then(|parser| {
            Some(GrammarSource {
                library: PathBuf::from(parser.library?),
                language: parser.language?,
                symbol: parser.symbol,
            })
        });
        let engine = settings.engine.unwrap_or_default();

        Self {
            default_scope: Arc::from(
                settings
                    .default_scope
                    .as_deref()
                    .unwrap_or(defaults::DEFAULT_SCOPE),
            ),
            scope_map: settings.scopes.into_iter().collect(),
            grammar,
            engine_cmd: engine.cmd.filter(|cmd| !cmd.is_empty()),
            engine_timeout: Duration::from_millis(
                engine
                    .timeout_ms
                    .unwrap_or(defaults::DEFAULT_ENGINE_TIMEOUT_MS),
            ),
        }
    }
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        defaults::default_settings().into()
    }
}
