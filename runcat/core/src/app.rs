//! Application Wiring
//!
//! Builds the component graph from an [`AgentConfig`] and runs the single
//! menu-event dispatch loop:
//!
//! ```text
//!   MenuEvent stream ──▶ App::run ──▶ AnimationEngine setters
//!                                   └─▶ SettingsStore::save (on change)
//!   LoadSampler ──────────────────▶ AnimationEngine::update_load
//!   theme poll task ──────────────▶ ThemeResolver::refresh_from_system
//! ```
//!
//! Platform calls and settings writes run on the blocking pool so the
//! dispatch loop and the tick loop never stall behind them.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::assets::{AssetSource, DirAssetSource, EmbeddedAssetSource, IconStore};
use crate::config::AgentConfig;
use crate::engine::AnimationEngine;
use crate::platform::{self, Platform};
use crate::sampler::{CpuProbe, LoadSampler, SysinfoProbe};
use crate::settings::{self, Settings, SettingsStore, TomlSettingsStore};
use crate::surface::{MenuEvent, MenuItemId, TrayHandle};
use crate::theme::ThemeResolver;

/// What the dispatch loop should do after an event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading events
    Continue,
    /// The user asked to quit
    Quit,
}

/// Pluggable collaborators of the app
pub struct AppParts {
    /// OS capabilities
    pub platform: Arc<dyn Platform>,
    /// Icon bytes
    pub assets: Arc<dyn AssetSource>,
    /// CPU readings
    pub cpu_probe: Box<dyn CpuProbe>,
    /// Persisted user choices
    pub settings: Arc<dyn SettingsStore>,
}

impl AppParts {
    /// The real OS and the assets and settings file named by `config`
    #[must_use]
    pub fn native(config: &AgentConfig) -> Self {
        Self {
            platform: platform::native(),
            assets: asset_source(config),
            cpu_probe: Box::new(SysinfoProbe::new()),
            settings: Arc::new(TomlSettingsStore::new(&config.settings_path)),
        }
    }
}

/// Built-in frames unless `config` names a directory
#[must_use]
pub fn asset_source(config: &AgentConfig) -> Arc<dyn AssetSource> {
    match &config.assets_dir {
        Some(dir) => Arc::new(DirAssetSource::new(dir)),
        None => Arc::new(EmbeddedAssetSource),
    }
}

/// The running agent
pub struct App {
    config: AgentConfig,
    engine: Arc<AnimationEngine>,
    resolver: Arc<ThemeResolver>,
    sampler: LoadSampler,
    settings: Arc<dyn SettingsStore>,
    theme_poll: Mutex<Option<JoinHandle<()>>>,
}

impl App {
    /// Assemble the components
    ///
    /// Loads the saved settings (writing defaults on first run), probes the
    /// asset frame counts and resolves the initial theme. Nothing runs until
    /// [`start`](Self::start).
    pub fn new(config: AgentConfig, parts: AppParts, tray: TrayHandle) -> Self {
        let saved = settings::load_or_init(parts.settings.as_ref());

        let resolver = Arc::new(ThemeResolver::new(
            platform::theme_probe(&parts.platform),
            saved.theme,
        ));
        let store = Arc::new(IconStore::new(parts.assets));
        let engine = AnimationEngine::new(
            store,
            Arc::clone(&resolver),
            parts.platform,
            tray,
            &saved,
        );

        Self {
            config,
            engine,
            resolver,
            sampler: LoadSampler::new(parts.cpu_probe),
            settings: parts.settings,
            theme_poll: Mutex::new(None),
        }
    }

    /// Start animating, sampling and polling the OS theme
    pub async fn start(&self) {
        if !self.engine.start().await {
            debug!("Engine already started");
            return;
        }

        let engine = Arc::clone(&self.engine);
        self.sampler
            .start(self.config.sample_interval, move |percent| engine.update_load(percent));

        let handle = tokio::spawn(theme_poll_loop(
            Arc::clone(&self.resolver),
            self.config.theme_poll_interval,
        ));
        *self.theme_poll.lock() = Some(handle);
        info!("Agent running");
    }

    /// Dispatch menu events until Quit or until the stream ends
    pub async fn run(&self, mut events: mpsc::UnboundedReceiver<MenuEvent>) {
        while let Some(event) = events.recv().await {
            if self.handle_event(event).await == Flow::Quit {
                info!("Quit requested from menu");
                return;
            }
        }
        debug!("Menu event stream closed");
    }

    /// Apply one menu click
    pub async fn handle_event(&self, event: MenuEvent) -> Flow {
        debug!(event = ?event, "Menu event");
        let changed = match event {
            MenuItemId::Creature(creature) => self.engine.set_creature(creature),
            MenuItemId::Speed(policy) => self.engine.set_speed_policy(policy),
            MenuItemId::Theme(mode) => {
                let engine = Arc::clone(&self.engine);
                tokio::task::spawn_blocking(move || engine.set_theme_mode(mode))
                    .await
                    .unwrap_or_else(|e| {
                        warn!(error = %e, "Theme change task failed");
                        false
                    })
            }
            MenuItemId::Autostart => {
                let engine = Arc::clone(&self.engine);
                // Failures are logged by the engine; the checkbox stays put
                if let Err(e) = tokio::task::spawn_blocking(move || engine.toggle_autostart()).await {
                    warn!(error = %e, "Start-at-login task failed");
                }
                false
            }
            MenuItemId::SystemMonitor => {
                let engine = Arc::clone(&self.engine);
                if let Err(e) =
                    tokio::task::spawn_blocking(move || engine.open_system_monitor()).await
                {
                    warn!(error = %e, "System monitor task failed");
                }
                false
            }
            MenuItemId::About => {
                info!(version = env!("CARGO_PKG_VERSION"), "RunCat");
                false
            }
            MenuItemId::Quit => return Flow::Quit,
        };

        if changed {
            self.persist().await;
        }
        Flow::Continue
    }

    /// Stop sampling, polling and animating, in that order
    pub fn shutdown(&self) {
        self.sampler.stop();
        if let Some(handle) = self.theme_poll.lock().take() {
            handle.abort();
        }
        self.engine.stop();
        info!("Agent stopped");
    }

    /// The engine, for inspection
    #[must_use]
    pub fn engine(&self) -> &Arc<AnimationEngine> {
        &self.engine
    }

    /// Whether the sampler is live
    #[must_use]
    pub fn is_sampling(&self) -> bool {
        self.sampler.is_running()
    }

    async fn persist(&self) {
        let snapshot: Settings = self.engine.settings();
        let store = Arc::clone(&self.settings);
        match tokio::task::spawn_blocking(move || store.save(&snapshot)).await {
            Ok(Ok(())) => debug!("Settings saved"),
            Ok(Err(e)) => warn!(error = %e, "Failed to save settings"),
            Err(e) => warn!(error = %e, "Settings save task failed"),
        }
    }
}

async fn theme_poll_loop(resolver: Arc<ThemeResolver>, period: std::time::Duration) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let resolver = Arc::clone(&resolver);
        if let Err(e) = tokio::task::spawn_blocking(move || resolver.refresh_from_system()).await {
            warn!(error = %e, "Theme refresh failed");
        }
    }
}
