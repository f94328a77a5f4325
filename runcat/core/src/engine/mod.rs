//! Animation Engine
//!
//! The state machine that makes the runner run. It owns the single
//! [`AnimationState`] record and a self-rescheduling tick loop, and it is
//! the only thing that talks to the tray surface.
//!
//! # Design
//!
//! ```text
//!   tick loop ─────┐
//!   LoadSampler ───┤                      ┌──▶ IconStore.frame()
//!   ThemeResolver ─┼──▶ Mutex<EngineState>┤
//!   menu dispatch ─┘                      └──▶ TrayHandle (queued, non-blocking)
//! ```
//!
//! Every input (tick, CPU reading, theme change, menu click) enters through
//! a method that takes the one state lock, performs its read-modify-write
//! and enqueues any tray updates before releasing it. Tray commands are
//! queued rather than executed, so the lock is never held across a widget
//! call, and the queue preserves the order in which state changed.
//!
//! Platform calls (autostart, task manager) and theme resolution may block.
//! They run without the state lock held.
//!
//! # Stopping
//!
//! [`AnimationEngine::stop`] marks the state as shut down under the lock,
//! then wakes and aborts the tick loop. Every push checks the flag under the
//! same lock, so nothing reaches the tray after `stop` returns.

mod menu;
mod speed;
mod state;

pub use menu::{build_menu, ABOUT_LABEL};
pub use speed::{adaptive_interval, SpeedCap, SpeedPolicy, BASE_INTERVAL, MIN_INTERVAL};
pub use state::AnimationState;

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::assets::IconStore;
use crate::creature::Creature;
use crate::platform::{Platform, PlatformError};
use crate::settings::Settings;
use crate::surface::{MenuItemId, TrayCommand, TrayHandle};
use crate::theme::{EffectiveTheme, ThemeMode, ThemeResolver};

#[derive(Debug)]
struct EngineState {
    anim: AnimationState,
    started: bool,
    shutdown: bool,
}

/// Drives the tray icon animation
pub struct AnimationEngine {
    store: Arc<IconStore>,
    resolver: Arc<ThemeResolver>,
    platform: Arc<dyn Platform>,
    tray: TrayHandle,
    state: Mutex<EngineState>,
    stop_signal: Arc<Notify>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    /// Held across a whole start-at-login toggle, OS call included
    autostart_gate: Mutex<()>,
}

impl AnimationEngine {
    /// Create a stopped engine
    ///
    /// The resolver is switched to `settings.theme` before any listener is
    /// attached, so the initial theme never produces a notification.
    pub fn new(
        store: Arc<IconStore>,
        resolver: Arc<ThemeResolver>,
        platform: Arc<dyn Platform>,
        tray: TrayHandle,
        settings: &Settings,
    ) -> Arc<Self> {
        resolver.set_mode(settings.theme);
        let anim = AnimationState::new(settings.runner, resolver.effective(), settings.speed_limit);

        Arc::new(Self {
            store,
            resolver,
            platform,
            tray,
            state: Mutex::new(EngineState {
                anim,
                started: false,
                shutdown: false,
            }),
            stop_signal: Arc::new(Notify::new()),
            ticker: Mutex::new(None),
            autostart_gate: Mutex::new(()),
        })
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Paint the first frame, build the menu, start ticking and subscribe to
    /// theme changes
    ///
    /// Returns `false` if the engine was already started or has been stopped.
    /// Must be called from within a tokio runtime.
    pub async fn start(self: &Arc<Self>) -> bool {
        {
            let state = self.state.lock();
            if state.started || state.shutdown {
                return false;
            }
        }

        let platform = Arc::clone(&self.platform);
        let autostart = match tokio::task::spawn_blocking(move || platform.is_startup_enabled()).await {
            Ok(Ok(enabled)) => enabled,
            Ok(Err(e)) => {
                warn!(error = %e, "Cannot read start-at-login state");
                false
            }
            Err(e) => {
                warn!(error = %e, "Start-at-login probe panicked");
                false
            }
        };

        {
            let mut state = self.state.lock();
            if state.started || state.shutdown {
                return false;
            }
            state.started = true;
            state.anim.effective_theme = self.resolver.effective();
            state.anim.frame_index = 0;
            state.anim.autostart = autostart;

            self.push_frame(&state.anim);
            self.send(TrayCommand::SetMenu(build_menu(&state.anim, self.resolver.mode())));
        }

        let weak = Arc::downgrade(self);
        let handle = tokio::spawn(tick_loop(Arc::downgrade(self), Arc::clone(&self.stop_signal)));
        *self.ticker.lock() = Some(handle);

        self.resolver.set_change_listener(Arc::new(move |theme| {
            if let Some(engine) = weak.upgrade() {
                engine.on_theme_changed(theme);
            }
        }));
        // Catch a change that landed between the first paint and the subscription
        self.on_theme_changed(self.resolver.effective());

        info!(
            creature = %self.creature(),
            theme = %self.effective_theme(),
            "Animation engine started"
        );
        true
    }

    /// Halt the tick loop and suppress all further tray updates
    pub fn stop(&self) {
        {
            let mut state = self.state.lock();
            if state.shutdown {
                return;
            }
            state.shutdown = true;
        }
        self.stop_signal.notify_one();
        if let Some(handle) = self.ticker.lock().take() {
            handle.abort();
        }
        info!("Animation engine stopped");
    }

    /// Whether the tick loop is live
    #[must_use]
    pub fn is_running(&self) -> bool {
        let state = self.state.lock();
        state.started && !state.shutdown
    }

    // =========================================================================
    // Inputs
    // =========================================================================

    /// Advance to the next frame and paint it
    ///
    /// Uses the creature and theme current at the moment of the tick.
    /// Returns `false` once the engine is stopped.
    pub fn tick(&self) -> bool {
        let mut state = self.state.lock();
        if state.shutdown {
            return false;
        }
        let count = self
            .store
            .frame_count(state.anim.creature, state.anim.effective_theme);
        state.anim.advance(count);
        trace!(frame = state.anim.frame_index, "Tick");
        self.push_frame(&state.anim);
        true
    }

    /// Switch runner. Restarts at frame 0 and repaints immediately.
    ///
    /// Returns `false` when `creature` is already selected.
    pub fn set_creature(&self, creature: Creature) -> bool {
        let mut state = self.state.lock();
        if state.shutdown || state.anim.creature == creature {
            return false;
        }
        state.anim.creature = creature;
        state.anim.frame_index = 0;
        info!(creature = %creature, "Runner changed");

        for (id, checked) in menu::radio(&Creature::ALL, creature, MenuItemId::Creature) {
            self.send(TrayCommand::SetChecked { id, checked });
        }
        self.push_frame(&state.anim);
        true
    }

    /// Change the theme preference
    ///
    /// Delegates to the resolver. A resulting effective-theme change comes
    /// back through [`on_theme_changed`](Self::on_theme_changed). May block
    /// on the OS theme probe when switching to auto.
    pub fn set_theme_mode(&self, mode: ThemeMode) -> bool {
        if self.state.lock().shutdown {
            return false;
        }
        // The resolver may call back into on_theme_changed; no lock held here
        if !self.resolver.set_mode(mode) {
            return false;
        }

        let state = self.state.lock();
        if !state.shutdown {
            for (id, checked) in menu::radio(&ThemeMode::ALL, mode, MenuItemId::Theme) {
                self.send(TrayCommand::SetChecked { id, checked });
            }
        }
        true
    }

    /// Effective-theme change notification from the resolver
    ///
    /// Keeps the frame index, clamped into the new theme's frame set, and
    /// repaints.
    pub fn on_theme_changed(&self, theme: EffectiveTheme) {
        let mut state = self.state.lock();
        if state.shutdown || state.anim.effective_theme == theme {
            return;
        }
        state.anim.effective_theme = theme;
        let count = self.store.frame_count(state.anim.creature, theme);
        state.anim.clamp_index(count);
        info!(theme = %theme, frame = state.anim.frame_index, "Theme applied");
        self.push_frame(&state.anim);
    }

    /// Change the speed policy, effective from the next tick
    ///
    /// Returns `false` when `policy` is already active.
    pub fn set_speed_policy(&self, policy: SpeedPolicy) -> bool {
        let mut state = self.state.lock();
        if state.shutdown || state.anim.speed_policy == policy {
            return false;
        }
        state.anim.speed_policy = policy;
        state.anim.recompute_interval();
        info!(
            policy = %policy,
            interval_ms = state.anim.interval.as_millis(),
            "Speed limit changed"
        );

        for (id, checked) in menu::radio(&SpeedPolicy::ALL, policy, MenuItemId::Speed) {
            self.send(TrayCommand::SetChecked { id, checked });
        }
        true
    }

    /// Record a CPU reading
    ///
    /// Updates the tooltip and, under the adaptive policy, the interval used
    /// for the next wait. A wait already in progress is not cut short.
    pub fn update_load(&self, cpu_percent: f64) {
        let mut state = self.state.lock();
        if state.shutdown {
            return;
        }
        let cpu = if cpu_percent.is_finite() {
            cpu_percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
        state.anim.last_cpu = cpu;
        state.anim.recompute_interval();
        trace!(cpu, interval_ms = state.anim.interval.as_millis(), "Load updated");
        self.send(TrayCommand::SetTooltip(format!("CPU: {cpu:.1}%")));
    }

    /// Flip "Start at Login"
    ///
    /// Blocks on the platform call, which runs without the state lock.
    /// Overlapping toggles are applied one after the other. On failure
    /// nothing changes; once the engine is stopped the OS is left alone and
    /// the current value is returned.
    ///
    /// # Errors
    ///
    /// Returns the `PlatformError` from the OS (already logged).
    pub fn toggle_autostart(&self) -> Result<bool, PlatformError> {
        let _toggle = self.autostart_gate.lock();
        let target = {
            let state = self.state.lock();
            if state.shutdown {
                debug!("Engine stopped, ignoring start-at-login toggle");
                return Ok(state.anim.autostart);
            }
            !state.anim.autostart
        };

        if let Err(e) = self.platform.set_startup(target) {
            warn!(error = %e, enabled = target, "Failed to change start at login");
            return Err(e);
        }

        let mut state = self.state.lock();
        state.anim.autostart = target;
        info!(enabled = target, "Start at login changed");
        if !state.shutdown {
            self.send(TrayCommand::SetChecked {
                id: MenuItemId::Autostart,
                checked: target,
            });
        }
        Ok(target)
    }

    /// Launch the OS task manager
    ///
    /// # Errors
    ///
    /// Returns the `PlatformError` from the OS (already logged).
    pub fn open_system_monitor(&self) -> Result<(), PlatformError> {
        self.platform.open_system_monitor().map_err(|e| {
            warn!(error = %e, "Failed to open system monitor");
            e
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Copy of the animation state
    #[must_use]
    pub fn snapshot(&self) -> AnimationState {
        self.state.lock().anim
    }

    /// The user choices to persist
    #[must_use]
    pub fn settings(&self) -> Settings {
        let anim = self.snapshot();
        Settings {
            runner: anim.creature,
            theme: self.resolver.mode(),
            speed_limit: anim.speed_policy,
        }
    }

    /// Current runner
    #[must_use]
    pub fn creature(&self) -> Creature {
        self.state.lock().anim.creature
    }

    /// Theme variant on display
    #[must_use]
    pub fn effective_theme(&self) -> EffectiveTheme {
        self.state.lock().anim.effective_theme
    }

    /// Current theme preference
    #[must_use]
    pub fn theme_mode(&self) -> ThemeMode {
        self.resolver.mode()
    }

    /// Active speed policy
    #[must_use]
    pub fn speed_policy(&self) -> SpeedPolicy {
        self.state.lock().anim.speed_policy
    }

    /// Current frame index
    #[must_use]
    pub fn frame_index(&self) -> usize {
        self.state.lock().anim.frame_index
    }

    /// Delay before the next tick
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.state.lock().anim.interval
    }

    // =========================================================================
    // Tray output (called with the state lock held)
    // =========================================================================

    fn push_frame(&self, anim: &AnimationState) {
        match self
            .store
            .frame(anim.creature, anim.effective_theme, anim.frame_index)
        {
            Ok(icon) => self.send(TrayCommand::SetIcon(icon)),
            // The store reports incomplete sets once, when it loads them
            Err(e) => trace!(
                error = %e,
                creature = %anim.creature,
                theme = %anim.effective_theme,
                frame = anim.frame_index,
                "Frame unavailable, keeping last icon"
            ),
        }
    }

    fn send(&self, command: TrayCommand) {
        if let Err(e) = self.tray.send(command) {
            debug!(error = %e, "Dropping tray update");
        }
    }
}

impl fmt::Debug for AnimationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("AnimationEngine")
            .field("state", &state.anim)
            .field("running", &(state.started && !state.shutdown))
            .finish_non_exhaustive()
    }
}

/// Wait the current interval, tick, repeat
///
/// The interval is re-read after every tick so a speed change applies to
/// the very next wait.
async fn tick_loop(engine: Weak<AnimationEngine>, stop: Arc<Notify>) {
    loop {
        let Some(frame_delay) = engine.upgrade().map(|engine| engine.interval()) else {
            break;
        };

        tokio::select! {
            biased;
            () = stop.notified() => break,
            () = tokio::time::sleep(frame_delay) => {}
        }

        match engine.upgrade() {
            Some(engine) if engine.tick() => {}
            _ => break,
        }
    }
    debug!("Tick loop exited");
}
