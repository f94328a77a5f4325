//! User Settings Persistence
//!
//! The three user choices (runner, theme, speed limit) are kept in a small
//! TOML file and rewritten after every accepted change:
//!
//! ```toml
//! runner = "horse"
//! theme = "auto"
//! speed_limit = "cpu20"
//! ```
//!
//! Persistence is best effort. The in-memory state stays authoritative for
//! the running session when a write fails.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::creature::Creature;
use crate::engine::SpeedPolicy;
use crate::theme::ThemeMode;

/// Errors from the settings file
#[derive(Debug, Error)]
pub enum SettingsError {
    /// No settings saved yet (first run)
    #[error("Settings file not found at {0}")]
    NotFound(PathBuf),

    /// The file exists but cannot be read
    #[error("Failed to read settings at {path}: {source}")]
    Read {
        /// File that was read
        path: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },

    /// The file or its directory cannot be written
    #[error("Failed to write settings at {path}: {source}")]
    Write {
        /// File that was written
        path: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },

    /// The file is not valid settings TOML
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// The settings cannot be encoded
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Persisted user choices
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Selected creature
    pub runner: Creature,
    /// Selected theme mode
    pub theme: ThemeMode,
    /// Selected speed policy
    pub speed_limit: SpeedPolicy,
}

/// Load/save seam for [`Settings`]
pub trait SettingsStore: Send + Sync {
    /// Read the saved settings
    ///
    /// # Errors
    ///
    /// `SettingsError::NotFound` on first run, other variants when the file
    /// is unreadable or malformed.
    fn load(&self) -> Result<Settings, SettingsError>;

    /// Replace the saved settings
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the file cannot be written.
    fn save(&self, settings: &Settings) -> Result<(), SettingsError>;
}

/// Default settings file, `$XDG_CONFIG_HOME/runcat/settings.toml`
#[must_use]
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("runcat").join("settings.toml"))
}

/// [`SettingsStore`] backed by a TOML file
#[derive(Clone, Debug)]
pub struct TomlSettingsStore {
    path: PathBuf,
}

impl TomlSettingsStore {
    /// Store at an explicit path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File this store reads and writes
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for TomlSettingsStore {
    fn load(&self) -> Result<Settings, SettingsError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SettingsError::NotFound(self.path.clone()));
            }
            Err(source) => {
                return Err(SettingsError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let settings = toml::from_str(&content)?;
        debug!(path = %self.path.display(), "Loaded settings");
        Ok(settings)
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let content = toml::to_string(settings)?;
        let write_err = |source| SettingsError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        std::fs::write(&self.path, content).map_err(write_err)?;
        debug!(path = %self.path.display(), "Saved settings");
        Ok(())
    }
}

/// Load settings, falling back to defaults
///
/// On first run the defaults are written once. Any other failure is logged
/// and the defaults are used without touching the file.
pub fn load_or_init(store: &dyn SettingsStore) -> Settings {
    match store.load() {
        Ok(settings) => {
            info!(
                runner = %settings.runner,
                theme = %settings.theme,
                speed_limit = %settings.speed_limit,
                "Restored settings"
            );
            settings
        }
        Err(SettingsError::NotFound(path)) => {
            info!(path = %path.display(), "No saved settings, writing defaults");
            let settings = Settings::default();
            if let Err(e) = store.save(&settings) {
                warn!(error = %e, "Failed to write default settings");
            }
            settings
        }
        Err(e) => {
            warn!(error = %e, "Unusable settings file, using defaults");
            Settings::default()
        }
    }
}
