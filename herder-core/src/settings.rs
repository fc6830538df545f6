//! User settings from `<config_dir>/settings.json`.
//!
//! Only one knob exists today: a filename prefix applied to mirrored
//! workflow files (`plan.md` → `v-plan.md`).

use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::layout::Layout;

/// User-configurable options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Prepended to workflow output filenames when enabled.
    #[serde(default)]
    pub command_prefix: String,

    /// Toggles prefix application. Off by default.
    #[serde(default)]
    pub command_prefix_enabled: bool,
}

impl Settings {
    /// Load settings for the repository at `repo`.
    ///
    /// A missing file yields defaults. An enabled-but-empty prefix is
    /// normalized to disabled.
    pub fn load_at(repo: &Path, layout: &Layout) -> Result<Self, CoreError> {
        let path = layout.settings_path(repo);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(CoreError::Io { path, source }),
        };
        let mut settings: Settings = serde_json::from_str(&contents)
            .map_err(|source| CoreError::Parse { path, source })?;
        if settings.command_prefix_enabled && settings.command_prefix.is_empty() {
            settings.command_prefix_enabled = false;
        }
        Ok(settings)
    }

    /// Return `filename` with the command prefix applied, or unchanged when
    /// the prefix is disabled.
    pub fn prefix_command(&self, filename: &str) -> String {
        if !self.command_prefix_enabled {
            return filename.to_owned();
        }
        format!("{}{}", self.command_prefix, filename)
    }
}
