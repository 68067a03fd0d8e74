//! User configuration loading for treelens.
//!
//! User config location: $XDG_CONFIG_HOME/treelens/treelens.toml
//! Fallback: the platform config directory (`~/.config` on Linux)

use std::fs;
use std::path::PathBuf;

use super::settings::TreelensSettings;
use crate::error::ConfigError;

pub const CONFIG_FILE_NAME: &str = "treelens.toml";

pub type UserConfigResult<T> = Result<T, ConfigError>;

/// Returns the path to the user configuration file.
///
/// The path is determined by:
/// 1. If $XDG_CONFIG_HOME is set: $XDG_CONFIG_HOME/treelens/treelens.toml
/// 2. Otherwise: `dirs::config_dir()`/treelens/treelens.toml
///
/// Returns None if no config directory can be determined.
pub fn user_config_path() -> Option<PathBuf> {
    let base = match std::env::var_os("XDG_CONFIG_HOME") {
        Some(xdg_config) if !xdg_config.is_empty() => PathBuf::from(xdg_config),
        _ => dirs::config_dir()?,
    };
    Some(base.join("treelens").join(CONFIG_FILE_NAME))
}

/// Load the user config; `Ok(None)` when the file does not exist
pub fn load_user_config() -> UserConfigResult<Option<TreelensSettings>> {
    let Some(path) = user_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }
    load_config_file(path).map(Some)
}

/// Read and parse one TOML configuration file
pub fn load_config_file(path: PathBuf) -> UserConfigResult<TreelensSettings> {
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(source) => return Err(ConfigError::Read { path, source }),
    };
    toml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
}
