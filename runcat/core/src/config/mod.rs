//! TOML Configuration File Support
//!
//! Operator-level settings for the agent process, read once at startup from
//! `~/.config/runcat/agent.toml`. These are distinct from the user's menu
//! choices, which live in [`crate::settings`].
//!
//! # Configuration Priority
//!
//! Highest first:
//! 1. Environment variables
//! 2. TOML configuration file
//! 3. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [sampler]
//! interval_secs = 3
//!
//! [theme]
//! poll_interval_secs = 5
//!
//! [assets]
//! dir = "/usr/share/runcat"
//!
//! [settings]
//! path = "/home/me/.config/runcat/settings.toml"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sampler::MIN_SAMPLE_INTERVAL;

/// Environment variable naming an asset root on disk
pub const ENV_ASSETS_DIR: &str = "RUNCAT_ASSETS_DIR";
/// Environment variable for the CPU sampling period in seconds
pub const ENV_SAMPLE_INTERVAL: &str = "RUNCAT_SAMPLE_INTERVAL";
/// Environment variable for the OS theme poll period in seconds
pub const ENV_THEME_POLL_INTERVAL: &str = "RUNCAT_THEME_POLL_INTERVAL";
/// Environment variable naming the settings file
pub const ENV_SETTINGS_PATH: &str = "RUNCAT_SETTINGS_PATH";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Where the configuration came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// At least one environment variable applied
    Env,
    /// Loaded from the TOML file
    File,
    /// Built-in defaults only
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[sampler]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerToml {
    /// CPU sampling period in seconds
    pub interval_secs: Option<u64>,
}

/// `[theme]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeToml {
    /// OS theme poll period in seconds
    pub poll_interval_secs: Option<u64>,
}

/// `[assets]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsToml {
    /// Directory holding an `assets/` tree to use instead of the built-in frames
    pub dir: Option<PathBuf>,
}

/// `[settings]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsToml {
    /// Settings file location
    pub path: Option<PathBuf>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentToml {
    /// Sampler section
    pub sampler: SamplerToml,
    /// Theme section
    pub theme: ThemeToml,
    /// Assets section
    pub assets: AssetsToml,
    /// Settings section
    pub settings: SettingsToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved agent configuration
#[derive(Clone, Debug, PartialEq)]
pub struct AgentConfig {
    /// CPU sampling period, at least one second
    pub sample_interval: Duration,

    /// How often the OS theme is re-probed in auto mode
    pub theme_poll_interval: Duration,

    /// Directory holding an `assets/` tree, `None` for the built-in frames
    pub assets_dir: Option<PathBuf>,

    /// User settings file
    pub settings_path: PathBuf,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    source: ConfigSource,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_secs(3),
            theme_poll_interval: Duration::from_secs(5),
            assets_dir: None,
            settings_path: crate::settings::default_settings_path()
                .unwrap_or_else(|| PathBuf::from("runcat-settings.toml")),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl AgentConfig {
    /// Configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Read frames from a directory instead of the built-in set
    #[must_use]
    pub fn with_assets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = Some(dir.into());
        self
    }

    /// Override the settings file
    #[must_use]
    pub fn with_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = path.into();
        self
    }

    /// Override the sampling period
    #[must_use]
    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    /// Override the theme poll period
    #[must_use]
    pub fn with_theme_poll_interval(mut self, interval: Duration) -> Self {
        self.theme_poll_interval = interval;
        self
    }

    /// Check the resolved values
    ///
    /// # Errors
    ///
    /// `ConfigError::ValidationError` if a period is below one second.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_interval < MIN_SAMPLE_INTERVAL {
            return Err(ConfigError::ValidationError(format!(
                "sampler interval must be at least 1s, got {:?}",
                self.sample_interval
            )));
        }
        if self.theme_poll_interval < Duration::from_secs(1) {
            return Err(ConfigError::ValidationError(format!(
                "theme poll interval must be at least 1s, got {:?}",
                self.theme_poll_interval
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/runcat/agent.toml` or
/// `~/.config/runcat/agent.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("runcat").join("agent.toml"))
}

/// Load configuration from the default file and the environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<AgentConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed,
/// or the result fails validation.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<AgentConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration with an explicit environment lookup
///
/// # Errors
///
/// Same as [`load_config_from_path`].
pub fn load_config_with_env<F>(path: Option<PathBuf>, env: F) -> Result<AgentConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = AgentConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: AgentToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env);
    config.validate()?;
    Ok(config)
}

fn apply_toml_config(config: &mut AgentConfig, toml: &AgentToml) {
    if let Some(secs) = toml.sampler.interval_secs {
        config.sample_interval = Duration::from_secs(secs);
    }
    if let Some(secs) = toml.theme.poll_interval_secs {
        config.theme_poll_interval = Duration::from_secs(secs);
    }
    if let Some(ref dir) = toml.assets.dir {
        config.assets_dir = Some(dir.clone());
    }
    if let Some(ref path) = toml.settings.path {
        config.settings_path = path.clone();
    }
}

fn apply_env_config<F>(config: &mut AgentConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = env(ENV_ASSETS_DIR) {
        config.assets_dir = Some(PathBuf::from(dir));
        config.source = ConfigSource::Env;
    }
    if let Some(secs) = env(ENV_SAMPLE_INTERVAL) {
        match secs.parse::<u64>() {
            Ok(secs) => {
                config.sample_interval = Duration::from_secs(secs);
                config.source = ConfigSource::Env;
            }
            Err(_) => tracing::warn!(value = %secs, "Ignoring non-numeric {ENV_SAMPLE_INTERVAL}"),
        }
    }
    if let Some(secs) = env(ENV_THEME_POLL_INTERVAL) {
        match secs.parse::<u64>() {
            Ok(secs) => {
                config.theme_poll_interval = Duration::from_secs(secs);
                config.source = ConfigSource::Env;
            }
            Err(_) => {
                tracing::warn!(value = %secs, "Ignoring non-numeric {ENV_THEME_POLL_INTERVAL}");
            }
        }
    }
    if let Some(path) = env(ENV_SETTINGS_PATH) {
        config.settings_path = PathBuf::from(path);
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// Tests
// =============================================================================
