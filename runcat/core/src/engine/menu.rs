//! Tray menu layout

use crate::creature::Creature;
use crate::surface::{Menu, MenuEntry, MenuItemId};
use crate::theme::ThemeMode;

use super::speed::SpeedPolicy;
use super::state::AnimationState;

/// Text of the informational entry
pub const ABOUT_LABEL: &str = concat!("RunCat ", env!("CARGO_PKG_VERSION"));

/// Build the full menu for the current selections
#[must_use]
pub fn build_menu(state: &AnimationState, theme_mode: ThemeMode) -> Menu {
    let runners = Creature::ALL
        .iter()
        .map(|&c| check(MenuItemId::Creature(c), c.label(), c == state.creature))
        .collect();
    let themes = ThemeMode::ALL
        .iter()
        .map(|&m| check(MenuItemId::Theme(m), m.label(), m == theme_mode))
        .collect();
    let speeds = SpeedPolicy::ALL
        .iter()
        .map(|&p| check(MenuItemId::Speed(p), p.label(), p == state.speed_policy))
        .collect();

    Menu {
        entries: vec![
            MenuEntry::Submenu {
                label: "Runner".to_string(),
                entries: runners,
            },
            MenuEntry::Submenu {
                label: "Theme".to_string(),
                entries: themes,
            },
            check(MenuItemId::Autostart, "Start at Login", state.autostart),
            MenuEntry::Submenu {
                label: "Runner Speed Limit".to_string(),
                entries: speeds,
            },
            MenuEntry::Separator,
            item(MenuItemId::SystemMonitor, "Task Manager"),
            item(MenuItemId::About, ABOUT_LABEL),
            item(MenuItemId::Quit, "Quit"),
        ],
    }
}

/// Check-state updates that select `selected` among `choices`
pub(crate) fn radio<T, F>(choices: &[T], selected: T, id: F) -> impl Iterator<Item = (MenuItemId, bool)> + '_
where
    T: Copy + PartialEq,
    F: Fn(T) -> MenuItemId + 'static,
{
    choices.iter().map(move |&c| (id(c), c == selected))
}

fn check(id: MenuItemId, label: &str, checked: bool) -> MenuEntry {
    MenuEntry::Check {
        id,
        label: label.to_string(),
        checked,
    }
}

fn item(id: MenuItemId, label: &str) -> MenuEntry {
    MenuEntry::Item {
        id,
        label: label.to_string(),
    }
}
