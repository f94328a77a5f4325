//! Headless tray surface
//!
//! Stands in for an OS tray widget: every mutation is recorded and reported
//! through `tracing`. Icon swaps happen many times a second, so they are
//! logged at `trace`.

use runcat_core::{Menu, MenuEntry, MenuItemId, TraySurface};
use tracing::{debug, info, trace};

/// Tray surface that logs instead of drawing
#[derive(Debug, Default)]
pub struct LogSurface {
    menu: Menu,
    tooltip: String,
    icon_len: usize,
    icons_shown: u64,
}

impl LogSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TraySurface for LogSurface {
    fn set_icon(&mut self, icon: &[u8]) {
        self.icon_len = icon.len();
        self.icons_shown += 1;
        trace!(bytes = icon.len(), "Icon");
    }

    fn set_tooltip(&mut self, tooltip: &str) {
        if self.tooltip != tooltip {
            debug!(tooltip, "Tooltip");
            self.tooltip = tooltip.to_string();
        }
    }

    fn set_menu(&mut self, menu: &Menu) {
        self.menu = menu.clone();
        for line in render_menu(&self.menu) {
            info!("menu: {line}");
        }
    }

    fn set_checked(&mut self, id: MenuItemId, checked: bool) {
        if self.menu.set_checked(id, checked) {
            debug!(item = ?id, checked, "Menu check");
        }
    }

    fn quit(&mut self) {
        info!(
            icons = self.icons_shown,
            last_icon_bytes = self.icon_len,
            "Tray surface closed"
        );
    }
}

/// One line per entry, submenus indented
pub fn render_menu(menu: &Menu) -> Vec<String> {
    fn walk(entries: &[MenuEntry], depth: usize, out: &mut Vec<String>) {
        let indent = "  ".repeat(depth);
        for entry in entries {
            match entry {
                MenuEntry::Item { label, .. } => out.push(format!("{indent}{label}")),
                MenuEntry::Check { label, checked, .. } => {
                    let mark = if *checked { "x" } else { " " };
                    out.push(format!("{indent}[{mark}] {label}"));
                }
                MenuEntry::Submenu { label, entries } => {
                    out.push(format!("{indent}{label} >"));
                    walk(entries, depth + 1, out);
                }
                MenuEntry::Separator => out.push(format!("{indent}----")),
            }
        }
    }

    let mut out = Vec::new();
    walk(&menu.entries, 0, &mut out);
    out
}
