//! Settings persistence
//!
//! Resolves where the settings file lives and reads or writes it there.

use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::error::{ConfigError, SettingsError, SettingsResult};

const APP_DIR: &str = "eventkit";
const FILE_NAME: &str = "eventkit.toml";

/// Settings file at a fixed location
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the platform config directory, e.g.
    /// `~/.config/eventkit/eventkit.toml` on Linux
    pub fn at_default_location() -> SettingsResult<Self> {
        Ok(Self::new(Self::default_path()?))
    }

    pub fn default_path() -> SettingsResult<PathBuf> {
        let base = dirs::config_dir().ok_or_else(|| {
            ConfigError::UnsupportedPlatform(std::env::consts::OS.to_string())
        })?;
        Ok(base.join(APP_DIR).join(FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn load(&self) -> SettingsResult<Settings> {
        Settings::load_from_file(&self.path)
    }

    /// Load the file, falling back to defaults when it does not exist yet
    pub fn load_or_default(&self) -> SettingsResult<Settings> {
        if !self.exists() {
            tracing::debug!(
                "No settings at {}, using defaults",
                self.path.display()
            );
            return Ok(Settings::default());
        }
        self.load()
    }

    /// Write the file, creating its directory if needed
    pub fn save(&self, settings: &Settings) -> SettingsResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                SettingsError::ConfigDirectory(format!("{}: {}", parent.display(), e))
            })?;
        }
        settings.save_to_file(&self.path)
    }
}
