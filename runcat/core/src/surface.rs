//! Tray Surface
//!
//! The OS tray icon and its menu. The engine never calls the widget
//! directly: it enqueues [`TrayCommand`]s on a [`TrayHandle`], and a
//! dedicated tray thread owns the [`TraySurface`] and applies them in order.
//! Enqueuing never blocks, so the engine can dispatch a new icon without
//! holding its state lock across a slow UI call.
//!
//! Clicks flow the other way as [`MenuEvent`]s on a single unified stream
//! that the app reads in one dispatch loop.
//!
//! ```text
//!  AnimationEngine ──TrayCommand──▶ tray thread ──▶ TraySurface (widget)
//!        ▲                                              │
//!        └────────── App dispatch loop ◀──MenuEvent─────┘
//! ```

use std::fmt;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::assets::IconBytes;
use crate::creature::Creature;
use crate::engine::SpeedPolicy;
use crate::theme::ThemeMode;

/// Errors from the tray thread
#[derive(Debug, Error)]
pub enum TrayError {
    /// The tray thread has exited and no longer accepts commands
    #[error("Tray thread is gone")]
    ThreadGone,

    /// The tray thread could not be started
    #[error("Failed to spawn tray thread: {0}")]
    Spawn(#[from] std::io::Error),
}

// =============================================================================
// Menu model
// =============================================================================

/// Identity of a clickable menu entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MenuItemId {
    /// Creature choice
    Creature(Creature),
    /// Theme choice
    Theme(ThemeMode),
    /// Speed-limit choice
    Speed(SpeedPolicy),
    /// "Start at Login" checkbox
    Autostart,
    /// Opens the OS task manager / activity monitor
    SystemMonitor,
    /// Informational entry
    About,
    /// Exits the agent
    Quit,
}

impl MenuItemId {
    /// Stable string identity, used where a widget keys its entries by text
    ///
    /// `runner:horse`, `theme:auto`, `speed:cpu20`, `autostart`, `monitor`,
    /// `about`, `quit`.
    #[must_use]
    pub fn key(self) -> String {
        match self {
            Self::Creature(creature) => format!("runner:{}", creature.as_str()),
            Self::Theme(mode) => format!("theme:{}", mode.as_str()),
            Self::Speed(policy) => format!("speed:{}", policy.as_str()),
            Self::Autostart => "autostart".to_string(),
            Self::SystemMonitor => "monitor".to_string(),
            Self::About => "about".to_string(),
            Self::Quit => "quit".to_string(),
        }
    }

    /// Inverse of [`key`](Self::key)
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key.split_once(':') {
            Some(("runner", name)) => name.parse().ok().map(Self::Creature),
            Some(("theme", name)) => name.parse().ok().map(Self::Theme),
            Some(("speed", name)) => name.parse().ok().map(Self::Speed),
            Some(_) => None,
            None => match key {
                "autostart" => Some(Self::Autostart),
                "monitor" => Some(Self::SystemMonitor),
                "about" => Some(Self::About),
                "quit" => Some(Self::Quit),
                _ => None,
            },
        }
    }
}

/// A click on a menu entry
pub type MenuEvent = MenuItemId;

/// One menu entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MenuEntry {
    /// Plain clickable item
    Item {
        /// Identity reported on click
        id: MenuItemId,
        /// Visible text
        label: String,
    },
    /// Checkbox item
    Check {
        /// Identity reported on click
        id: MenuItemId,
        /// Visible text
        label: String,
        /// Initial check state
        checked: bool,
    },
    /// Submenu of entries
    Submenu {
        /// Visible text
        label: String,
        /// Children
        entries: Vec<MenuEntry>,
    },
    /// Visual separator
    Separator,
}

impl MenuEntry {
    /// Identity of this entry, if clickable
    #[must_use]
    pub fn id(&self) -> Option<MenuItemId> {
        match self {
            Self::Item { id, .. } | Self::Check { id, .. } => Some(*id),
            Self::Submenu { .. } | Self::Separator => None,
        }
    }
}

/// Full tray menu
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Menu {
    /// Top-level entries in display order
    pub entries: Vec<MenuEntry>,
}

impl Menu {
    /// Find the check state of an entry anywhere in the tree
    #[must_use]
    pub fn is_checked(&self, id: MenuItemId) -> Option<bool> {
        fn walk(entries: &[MenuEntry], id: MenuItemId) -> Option<bool> {
            entries.iter().find_map(|entry| match entry {
                MenuEntry::Check {
                    id: entry_id,
                    checked,
                    ..
                } if *entry_id == id => Some(*checked),
                MenuEntry::Submenu { entries, .. } => walk(entries, id),
                _ => None,
            })
        }
        walk(&self.entries, id)
    }

    /// Update the check state of an entry anywhere in the tree
    ///
    /// Returns `false` if no checkbox entry has that id.
    pub fn set_checked(&mut self, id: MenuItemId, checked: bool) -> bool {
        fn walk(entries: &mut [MenuEntry], id: MenuItemId, value: bool) -> bool {
            entries.iter_mut().any(|entry| match entry {
                MenuEntry::Check {
                    id: entry_id,
                    checked,
                    ..
                } if *entry_id == id => {
                    *checked = value;
                    true
                }
                MenuEntry::Submenu { entries, .. } => walk(entries, id, value),
                _ => false,
            })
        }
        walk(&mut self.entries, id, checked)
    }
}

// =============================================================================
// Commands
// =============================================================================

/// Mutation to apply on the tray thread
#[derive(Clone, PartialEq, Eq)]
pub enum TrayCommand {
    /// Replace the icon
    SetIcon(IconBytes),
    /// Replace the tooltip
    SetTooltip(String),
    /// Build (or rebuild) the menu
    SetMenu(Menu),
    /// Check or uncheck one entry
    SetChecked {
        /// Entry to update
        id: MenuItemId,
        /// New state
        checked: bool,
    },
    /// Tear down the widget and stop the tray thread
    Quit,
}

impl fmt::Debug for TrayCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetIcon(bytes) => write!(f, "SetIcon({} bytes)", bytes.len()),
            Self::SetTooltip(text) => f.debug_tuple("SetTooltip").field(text).finish(),
            Self::SetMenu(menu) => write!(f, "SetMenu({} entries)", menu.entries.len()),
            Self::SetChecked { id, checked } => f
                .debug_struct("SetChecked")
                .field("id", id)
                .field("checked", checked)
                .finish(),
            Self::Quit => f.write_str("Quit"),
        }
    }
}

/// Sink side of the OS tray widget
///
/// Implementations are created on, and only ever called from, the tray
/// thread, so they need not be `Send` or `Sync`.
pub trait TraySurface {
    /// Replace the icon image
    fn set_icon(&mut self, icon: &[u8]);

    /// Replace the hover text
    fn set_tooltip(&mut self, tooltip: &str);

    /// Build the menu
    fn set_menu(&mut self, menu: &Menu);

    /// Check or uncheck one entry
    fn set_checked(&mut self, id: MenuItemId, checked: bool);

    /// Tear down the widget
    fn quit(&mut self);

    /// How often the tray thread must hand control to [`pump`](Self::pump)
    /// while idle
    ///
    /// `None` (the default) means the widget needs no event pumping and the
    /// thread just waits for commands.
    fn pump_interval(&self) -> Option<Duration> {
        None
    }

    /// Dispatch pending OS events for the widget
    fn pump(&mut self) {}
}

impl<S: TraySurface + ?Sized> TraySurface for Box<S> {
    fn set_icon(&mut self, icon: &[u8]) {
        (**self).set_icon(icon);
    }

    fn set_tooltip(&mut self, tooltip: &str) {
        (**self).set_tooltip(tooltip);
    }

    fn set_menu(&mut self, menu: &Menu) {
        (**self).set_menu(menu);
    }

    fn set_checked(&mut self, id: MenuItemId, checked: bool) {
        (**self).set_checked(id, checked);
    }

    fn quit(&mut self) {
        (**self).quit();
    }

    fn pump_interval(&self) -> Option<Duration> {
        (**self).pump_interval()
    }

    fn pump(&mut self) {
        (**self).pump();
    }
}

/// Cloneable, non-blocking sender of [`TrayCommand`]s
#[derive(Clone, Debug)]
pub struct TrayHandle {
    tx: mpsc::UnboundedSender<TrayCommand>,
}

impl TrayHandle {
    /// Create a handle and the receiving end of its queue
    ///
    /// Useful for driving the engine without a tray thread (tests, embedding).
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TrayCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Enqueue a command
    ///
    /// # Errors
    ///
    /// Returns `TrayError::ThreadGone` once the receiving side is dropped.
    pub fn send(&self, command: TrayCommand) -> Result<(), TrayError> {
        self.tx.send(command).map_err(|_| TrayError::ThreadGone)
    }

    /// Whether the receiving side is gone
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The dedicated tray thread
///
/// Owns the surface for its whole life and applies commands strictly in
/// the order they were enqueued.
#[derive(Debug)]
pub struct TrayThread {
    handle: TrayHandle,
    join: Option<thread::JoinHandle<()>>,
}

impl TrayThread {
    /// Start the tray thread
    ///
    /// `make_surface` runs on the new thread, so widgets that must be
    /// created on the thread that uses them are supported.
    ///
    /// # Errors
    ///
    /// Returns `TrayError::Spawn` if the OS refuses to start the thread.
    pub fn spawn<F, S>(make_surface: F) -> Result<Self, TrayError>
    where
        F: FnOnce() -> S + Send + 'static,
        S: TraySurface + 'static,
    {
        let (handle, rx) = TrayHandle::channel();
        let join = thread::Builder::new()
            .name("runcat-tray".to_string())
            .spawn(move || run_tray(make_surface(), rx))?;

        Ok(Self {
            handle,
            join: Some(join),
        })
    }

    /// Sender for this thread's queue
    #[must_use]
    pub fn handle(&self) -> TrayHandle {
        self.handle.clone()
    }

    /// Ask the thread to quit and wait for it to finish
    ///
    /// Commands enqueued before this call are applied first.
    pub fn shutdown(mut self) {
        if self.handle.send(TrayCommand::Quit).is_err() {
            debug!("Tray thread already stopped");
        }
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                warn!("Tray thread panicked");
            }
        }
    }
}

fn run_tray<S: TraySurface>(mut surface: S, mut rx: mpsc::UnboundedReceiver<TrayCommand>) {
    info!("Tray thread started");
    match surface.pump_interval() {
        Some(every) => pump_commands(&mut surface, &mut rx, every),
        None => {
            while let Some(command) = rx.blocking_recv() {
                if !apply(&mut surface, command) {
                    break;
                }
            }
        }
    }
    info!("Tray thread stopped");
}

/// Interleave commands with the widget's event pump
///
/// Waits at most `every` for a command before pumping again.
fn pump_commands<S: TraySurface>(
    surface: &mut S,
    rx: &mut mpsc::UnboundedReceiver<TrayCommand>,
    every: Duration,
) {
    let timer = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            warn!(error = %e, "Failed to start tray pump timer, pumping on commands only");
            while let Some(command) = rx.blocking_recv() {
                surface.pump();
                if !apply(surface, command) {
                    break;
                }
            }
            return;
        }
    };

    loop {
        surface.pump();
        match timer.block_on(tokio::time::timeout(every, rx.recv())) {
            Ok(Some(command)) => {
                if !apply(surface, command) {
                    break;
                }
            }
            Ok(None) => break,
            Err(_) => {}
        }
    }
}

/// Apply one command, `false` once the surface has quit
fn apply<S: TraySurface>(surface: &mut S, command: TrayCommand) -> bool {
    match command {
        TrayCommand::SetIcon(icon) => surface.set_icon(&icon),
        TrayCommand::SetTooltip(text) => surface.set_tooltip(&text),
        TrayCommand::SetMenu(menu) => surface.set_menu(&menu),
        TrayCommand::SetChecked { id, checked } => surface.set_checked(id, checked),
        TrayCommand::Quit => {
            surface.quit();
            return false;
        }
    }
    true
}
