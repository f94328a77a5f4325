//! System tray widget backed by `tray-icon`
//!
//! Lives on the tray thread. The widget toolkit needs its events pumped on
//! that same thread: GTK on Linux, the Win32 message queue on Windows.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use tray_icon::menu::{
    CheckMenuItem, IsMenuItem, Menu as NativeMenu, MenuEvent as NativeMenuEvent, MenuId, MenuItem,
    PredefinedMenuItem, Submenu,
};
use tray_icon::{Icon, TrayIcon, TrayIconBuilder};

use runcat_core::{Menu, MenuEntry, MenuEvent, MenuItemId, TraySurface};

/// Idle pump period of the widget's event queue
const PUMP_INTERVAL: Duration = Duration::from_millis(16);

/// Edge length of the placeholder shown until the first frame arrives
const PLACEHOLDER_SIZE: u32 = 32;

pub struct NativeTray {
    icon: Option<TrayIcon>,
    checks: HashMap<MenuItemId, CheckMenuItem>,
}

impl NativeTray {
    /// Create the tray icon and route menu clicks to `events`
    pub fn new(events: mpsc::UnboundedSender<MenuEvent>) -> anyhow::Result<Self> {
        #[cfg(target_os = "linux")]
        gtk::init().context("Failed to initialize GTK")?;

        NativeMenuEvent::set_event_handler(Some(move |event: NativeMenuEvent| {
            match MenuItemId::from_key(&event.id.0) {
                Some(id) => {
                    if events.send(id).is_err() {
                        debug!(?id, "Menu click after the event stream closed");
                    }
                }
                None => warn!(id = %event.id.0, "Click on an unknown menu entry"),
            }
        }));

        let placeholder = Icon::from_rgba(
            vec![0; (PLACEHOLDER_SIZE * PLACEHOLDER_SIZE * 4) as usize],
            PLACEHOLDER_SIZE,
            PLACEHOLDER_SIZE,
        )?;
        let icon = TrayIconBuilder::new()
            .with_icon(placeholder)
            .with_tooltip("RunCat")
            .with_menu_on_left_click(true)
            .build()
            .context("Failed to create tray icon")?;

        Ok(Self {
            icon: Some(icon),
            checks: HashMap::new(),
        })
    }

    fn build_menu(&mut self, menu: &Menu) -> anyhow::Result<NativeMenu> {
        self.checks.clear();
        let items = build_items(&menu.entries, &mut self.checks)?;
        let native = NativeMenu::new();
        native.append_items(&item_refs(&items))?;
        Ok(native)
    }
}

impl TraySurface for NativeTray {
    fn set_icon(&mut self, icon: &[u8]) {
        let Some(tray) = &self.icon else { return };
        match decode_icon(icon) {
            Ok(decoded) => {
                if let Err(e) = tray.set_icon(Some(decoded)) {
                    debug!(error = %e, "Failed to set tray icon");
                }
            }
            Err(e) => debug!(error = %e, bytes = icon.len(), "Undecodable icon frame"),
        }
    }

    fn set_tooltip(&mut self, tooltip: &str) {
        let Some(tray) = &self.icon else { return };
        if let Err(e) = tray.set_tooltip(Some(tooltip)) {
            debug!(error = %e, "Failed to set tray tooltip");
        }
    }

    fn set_menu(&mut self, menu: &Menu) {
        match self.build_menu(menu) {
            Ok(native) => {
                if let Some(tray) = &self.icon {
                    tray.set_menu(Some(Box::new(native)));
                }
            }
            Err(e) => warn!(error = %e, "Failed to build tray menu"),
        }
    }

    fn set_checked(&mut self, id: MenuItemId, checked: bool) {
        match self.checks.get(&id) {
            Some(item) => item.set_checked(checked),
            None => debug!(?id, "No checkbox for entry"),
        }
    }

    fn quit(&mut self) {
        NativeMenuEvent::set_event_handler(None::<fn(NativeMenuEvent)>);
        self.checks.clear();
        self.icon = None;
        self.pump();
    }

    fn pump_interval(&self) -> Option<Duration> {
        Some(PUMP_INTERVAL)
    }

    #[cfg(target_os = "linux")]
    fn pump(&mut self) {
        while gtk::events_pending() {
            gtk::main_iteration_do(false);
        }
    }

    #[cfg(target_os = "windows")]
    fn pump(&mut self) {
        use windows_sys::Win32::UI::WindowsAndMessaging::{
            DispatchMessageW, PeekMessageW, TranslateMessage, MSG, PM_REMOVE,
        };

        // SAFETY: MSG is plain data, and the queue drained is this thread's own
        unsafe {
            let mut msg: MSG = std::mem::zeroed();
            while PeekMessageW(&mut msg, std::ptr::null_mut(), 0, 0, PM_REMOVE) != 0 {
                TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    }
}

/// Decode `.ico` (or any format `image` recognizes) into a tray icon
fn decode_icon(bytes: &[u8]) -> anyhow::Result<Icon> {
    let rgba = image::load_from_memory(bytes)?.into_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(Icon::from_rgba(rgba.into_raw(), width, height)?)
}

fn build_items(
    entries: &[MenuEntry],
    checks: &mut HashMap<MenuItemId, CheckMenuItem>,
) -> anyhow::Result<Vec<Box<dyn IsMenuItem>>> {
    let mut items: Vec<Box<dyn IsMenuItem>> = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            MenuEntry::Item { id, label } => {
                items.push(Box::new(MenuItem::with_id(
                    MenuId::new(id.key()),
                    label,
                    true,
                    None,
                )));
            }
            MenuEntry::Check { id, label, checked } => {
                let item =
                    CheckMenuItem::with_id(MenuId::new(id.key()), label, true, *checked, None);
                checks.insert(*id, item.clone());
                items.push(Box::new(item));
            }
            MenuEntry::Submenu { label, entries } => {
                let children = build_items(entries, checks)?;
                let submenu = Submenu::new(label, true);
                submenu.append_items(&item_refs(&children))?;
                items.push(Box::new(submenu));
            }
            MenuEntry::Separator => items.push(Box::new(PredefinedMenuItem::separator())),
        }
    }
    Ok(items)
}

fn item_refs(items: &[Box<dyn IsMenuItem>]) -> Vec<&dyn IsMenuItem> {
    items.iter().map(AsRef::as_ref).collect()
}
