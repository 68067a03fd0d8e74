//! Layered settings resolution for the language server.
//!
//! Layers apply in order: built-in defaults, the user config, the project
//! `treelens.toml`, then the object the client sent. A layer that fails to
//! load is reported and skipped while the others still apply.

use std::fmt;
use std::path::Path;

use serde_json::Value;

use crate::config::defaults::default_settings;
use crate::config::user::CONFIG_FILE_NAME;
use crate::config::{
    TreelensSettings, UserConfigResult, WorkspaceSettings, load_config_file, load_user_config,
    merge_all,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsEventKind {
    Info,
    Warning,
}

/// Something worth telling the user about while settings were resolved
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettingsEvent {
    pub kind: SettingsEventKind,
    pub message: String,
}

/// Where a client-supplied settings object came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsSource {
    InitializationOptions,
    ClientConfiguration,
}

impl fmt::Display for SettingsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InitializationOptions => "initialization options",
            Self::ClientConfiguration => "client configuration",
        })
    }
}

#[derive(Default, Debug)]
pub struct SettingsLoadOutcome {
    pub settings: WorkspaceSettings,
    pub events: Vec<SettingsEvent>,
}

#[derive(Default)]
struct LayerLog(Vec<SettingsEvent>);

impl LayerLog {
    fn push(&mut self, kind: SettingsEventKind, message: String) {
        self.0.push(SettingsEvent { kind, message });
    }

    /// Pass a loaded layer through, recording whether it applied
    fn keep<E: fmt::Display>(
        &mut self,
        label: &str,
        loaded: Result<Option<TreelensSettings>, E>,
    ) -> Option<TreelensSettings> {
        match loaded {
            Ok(Some(settings)) => {
                self.push(SettingsEventKind::Info, format!("Applied {label}"));
                Some(settings)
            }
            Ok(None) => None,
            Err(err) => {
                self.push(SettingsEventKind::Warning, format!("Skipped {label}: {err}"));
                None
            }
        }
    }
}

/// Resolve workspace settings: defaults < user < project < client
pub fn load_settings(
    root_path: Option<&Path>,
    client_settings: Option<(SettingsSource, Value)>,
) -> SettingsLoadOutcome {
    let mut log = LayerLog::default();

    let user = log.keep("user config", load_user_config());
    let project = log.keep(
        &format!("project {CONFIG_FILE_NAME}"),
        project_layer(root_path),
    );
    let client = client_settings
        .and_then(|(source, value)| log.keep(&source.to_string(), client_layer(value)));

    let settings = merge_all(&[Some(default_settings()), user, project, client])
        .map(WorkspaceSettings::from)
        .unwrap_or_default();

    SettingsLoadOutcome {
        settings,
        events: log.0,
    }
}

fn project_layer(root_path: Option<&Path>) -> UserConfigResult<Option<TreelensSettings>> {
    match root_path.map(|root| root.join(CONFIG_FILE_NAME)) {
        Some(path) if path.is_file() => load_config_file(path).map(Some),
        _ => Ok(None),
    }
}

/// `null` means the client sent nothing
fn client_layer(value: Value) -> serde_json::Result<Option<TreelensSettings>> {
    if value.is_null() {
        return Ok(None);
    }
    serde_json::from_value(value).map(Some)
}
