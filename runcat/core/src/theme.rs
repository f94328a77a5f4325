//! Theme Resolution
//!
//! Turns the user's theme preference (auto/light/dark) into the theme that is
//! actually rendered, and tells the single subscriber (the animation engine)
//! whenever that rendered theme changes.
//!
//! # Reentrancy
//!
//! The change listener is always invoked with the state lock released, so it
//! may call back into [`ThemeResolver::effective`] or [`ThemeResolver::mode`].
//! Notifications are serialized by a reentrant gate: two concurrent mode
//! changes cannot deliver their notifications out of order, and a listener
//! that re-enters `set_mode` on the same thread does not deadlock.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// User theme preference
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    /// Follow the operating system
    #[default]
    Auto,
    /// Always light
    Light,
    /// Always dark
    Dark,
}

impl ThemeMode {
    /// Every mode, in menu order
    pub const ALL: [ThemeMode; 3] = [ThemeMode::Auto, ThemeMode::Light, ThemeMode::Dark];

    /// Identifier used in settings files
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// Menu label
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Auto => "Auto",
            Self::Light => "Light",
            Self::Dark => "Dark",
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("unknown theme mode: {other}")),
        }
    }
}

/// The theme variant actually rendered. Never "auto".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectiveTheme {
    /// Light variant
    #[default]
    Light,
    /// Dark variant
    Dark,
}

impl EffectiveTheme {
    /// Both variants
    pub const ALL: [EffectiveTheme; 2] = [EffectiveTheme::Light, EffectiveTheme::Dark];

    /// Map an OS probe result. Anything other than "dark" is light.
    #[must_use]
    pub fn from_os_theme(probe: &str) -> Self {
        if probe.trim().eq_ignore_ascii_case("dark") {
            Self::Dark
        } else {
            Self::Light
        }
    }

    /// Identifier used in asset paths
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl fmt::Display for EffectiveTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-effort OS theme probe
///
/// Implementations must never fail; anything they cannot determine should be
/// reported as `"light"`.
pub trait ThemeProbe: Send + Sync {
    /// Current OS theme, `"light"` or `"dark"`
    fn system_theme(&self) -> String;
}

/// Callback invoked with the new effective theme after every actual change
pub type ThemeListener = Arc<dyn Fn(EffectiveTheme) + Send + Sync>;

#[derive(Debug, Clone, Copy)]
struct ResolverState {
    mode: ThemeMode,
    effective: EffectiveTheme,
}

/// Resolves [`ThemeMode`] into [`EffectiveTheme`] and publishes changes
pub struct ThemeResolver {
    probe: Arc<dyn ThemeProbe>,
    state: Mutex<ResolverState>,
    listener: Mutex<Option<ThemeListener>>,
    notify_gate: ReentrantMutex<()>,
}

impl ThemeResolver {
    /// Create a resolver and compute the initial effective theme
    ///
    /// No notification is sent for the initial resolution.
    pub fn new(probe: Arc<dyn ThemeProbe>, mode: ThemeMode) -> Self {
        let effective = resolve(probe.as_ref(), mode);
        debug!(mode = %mode, effective = %effective, "Theme resolver initialized");
        Self {
            probe,
            state: Mutex::new(ResolverState { mode, effective }),
            listener: Mutex::new(None),
            notify_gate: ReentrantMutex::new(()),
        }
    }

    /// Current user preference
    #[must_use]
    pub fn mode(&self) -> ThemeMode {
        self.state.lock().mode
    }

    /// Current rendered theme
    #[must_use]
    pub fn effective(&self) -> EffectiveTheme {
        self.state.lock().effective
    }

    /// Replace the change listener. Only one listener is kept.
    pub fn set_change_listener(&self, listener: ThemeListener) {
        *self.listener.lock() = Some(listener);
    }

    /// Change the user preference
    ///
    /// Returns `false` without doing anything when `mode` is already
    /// selected. The listener fires only if the effective theme changed.
    pub fn set_mode(&self, mode: ThemeMode) -> bool {
        let _gate = self.notify_gate.lock();

        let changed_to = {
            let mut state = self.state.lock();
            if state.mode == mode {
                return false;
            }
            state.mode = mode;
            let effective = resolve(self.probe.as_ref(), mode);
            if effective == state.effective {
                None
            } else {
                state.effective = effective;
                Some(effective)
            }
        };

        info!(mode = %mode, "Theme mode changed");
        if let Some(effective) = changed_to {
            self.notify(effective);
        }
        true
    }

    /// Re-probe the OS theme when in auto mode
    ///
    /// Returns the new effective theme if it changed. Repeated refreshes with
    /// an unchanged OS theme never notify.
    pub fn refresh_from_system(&self) -> Option<EffectiveTheme> {
        let _gate = self.notify_gate.lock();

        let changed_to = {
            let mut state = self.state.lock();
            if state.mode != ThemeMode::Auto {
                return None;
            }
            let effective = resolve(self.probe.as_ref(), ThemeMode::Auto);
            if effective == state.effective {
                return None;
            }
            state.effective = effective;
            effective
        };

        info!(effective = %changed_to, "System theme changed");
        self.notify(changed_to);
        Some(changed_to)
    }

    fn notify(&self, effective: EffectiveTheme) {
        // Clone out of the slot so the callback runs with no resolver lock held
        let listener = self.listener.lock().clone();
        if let Some(listener) = listener {
            listener(effective);
        }
    }
}

impl fmt::Debug for ThemeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = *self.state.lock();
        f.debug_struct("ThemeResolver")
            .field("mode", &state.mode)
            .field("effective", &state.effective)
            .finish_non_exhaustive()
    }
}

fn resolve(probe: &dyn ThemeProbe, mode: ThemeMode) -> EffectiveTheme {
    match mode {
        ThemeMode::Auto => EffectiveTheme::from_os_theme(&probe.system_theme()),
        ThemeMode::Light => EffectiveTheme::Light,
        ThemeMode::Dark => EffectiveTheme::Dark,
    }
}
