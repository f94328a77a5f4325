//! RunCat Core - Headless animation engine for the runcat tray agent
//!
//! A running creature lives in the system tray and runs faster the busier
//! the CPU is. This crate holds everything except the concrete tray widget:
//! the animation state machine, CPU sampling, light/dark theme resolution,
//! icon asset lookup, OS integration and settings persistence.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          Tray thread                              │
//! │            TraySurface (icon, tooltip, menu widget)               │
//! └──────────────▲───────────────────────────────────┬───────────────┘
//!                │ TrayCommand (queued)              │ MenuEvent
//! ┌──────────────┴───────────────────────────────────▼───────────────┐
//! │                            App                                    │
//! │  ┌──────────────────────────────────────────────────────────────┐ │
//! │  │                    AnimationEngine                           │ │
//! │  │   tick loop ─▶ Mutex<AnimationState> ─▶ IconStore            │ │
//! │  └────▲──────────────────────▲──────────────────────────────────┘ │
//! │       │ update_load          │ on_theme_changed                   │
//! │  ┌────┴────────┐      ┌──────┴────────┐      ┌─────────────────┐  │
//! │  │ LoadSampler │      │ ThemeResolver │◀─────│ Platform (OS)   │  │
//! │  └─────────────┘      └───────────────┘      └─────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`AnimationEngine`]: owns the animation state and the tick loop
//! - [`ThemeResolver`]: turns auto/light/dark into the rendered theme
//! - [`LoadSampler`]: periodic CPU utilization readings
//! - [`IconStore`]: cached frame sets per (creature, theme)
//! - [`TrayThread`]: dedicated thread owning a [`TraySurface`]
//! - [`App`]: wires everything and dispatches menu clicks
//!
//! # Module Overview
//!
//! - [`app`]: component wiring and the menu dispatch loop
//! - [`assets`]: asset path scheme, built-in frames, asset sources and the icon cache
//! - [`config`]: agent configuration (TOML file + environment)
//! - [`creature`]: the runner characters
//! - [`engine`]: animation state machine and speed policy
//! - [`platform`]: per-OS theme probe, autostart and task manager
//! - [`sampler`]: CPU load sampling
//! - [`settings`]: persisted user choices
//! - [`surface`]: tray command queue, tray thread and menu model
//! - [`theme`]: theme modes and resolution

#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod app;
pub mod assets;
pub mod config;
pub mod creature;
pub mod engine;
pub mod platform;
pub mod sampler;
pub mod settings;
pub mod surface;
pub mod theme;

pub use app::{asset_source, App, AppParts, Flow};
pub use assets::{
    frame_path, frame_pattern, AssetError, AssetSource, DirAssetSource, EmbeddedAssetSource,
    FrameSet, IconBytes, IconStore, MemoryAssetSource,
};
pub use creature::Creature;
pub use engine::{AnimationEngine, AnimationState, SpeedCap, SpeedPolicy, MIN_INTERVAL};
pub use platform::{Platform, PlatformError};
pub use sampler::{CpuProbe, LoadSampler, SampleError, SysinfoProbe};
pub use settings::{Settings, SettingsError, SettingsStore, TomlSettingsStore};
pub use surface::{
    Menu, MenuEntry, MenuEvent, MenuItemId, TrayCommand, TrayError, TrayHandle, TraySurface,
    TrayThread,
};
pub use theme::{EffectiveTheme, ThemeMode, ThemeProbe, ThemeResolver};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, AgentConfig, AgentToml, ConfigError,
    ConfigSource,
};
