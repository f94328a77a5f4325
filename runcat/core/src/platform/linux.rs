//! Linux desktop integration (freedesktop)

use std::path::PathBuf;

use tracing::debug;

use super::{run_capture, spawn_detached, Platform, PlatformError, APP_ID};

/// Monitors tried in order until one starts
const MONITORS: [&str; 3] = ["gnome-system-monitor", "plasma-systemmonitor", "xfce4-taskmanager"];

/// GNOME/KDE/XFCE flavoured Linux desktop
#[derive(Debug, Default)]
pub struct LinuxPlatform {
    autostart_dir: Option<PathBuf>,
}

impl LinuxPlatform {
    pub fn new() -> Self {
        Self {
            autostart_dir: dirs::config_dir().map(|p| p.join("autostart")),
        }
    }

    fn desktop_entry_path(&self) -> Result<PathBuf, PlatformError> {
        self.autostart_dir
            .as_ref()
            .map(|dir| dir.join(format!("{APP_ID}.desktop")))
            .ok_or_else(|| PlatformError::Environment("no XDG config directory".to_string()))
    }
}

fn desktop_entry(exec: &str) -> String {
    format!(
        "[Desktop Entry]\n\
         Type=Application\n\
         Name=RunCat\n\
         Comment=A running creature in the tray, paced by CPU load\n\
         Exec=\"{exec}\"\n\
         X-GNOME-Autostart-enabled=true\n\
         NoDisplay=true\n"
    )
}

impl Platform for LinuxPlatform {
    fn system_theme(&self) -> String {
        // Newer GNOME exposes an explicit preference
        if let Ok(scheme) = run_capture(
            "gsettings",
            &["get", "org.gnome.desktop.interface", "color-scheme"],
        ) {
            if scheme.contains("dark") {
                return "dark".to_string();
            }
            if scheme.contains("light") {
                return "light".to_string();
            }
        }

        match run_capture("gsettings", &["get", "org.gnome.desktop.interface", "gtk-theme"]) {
            Ok(theme) if theme.to_lowercase().contains("dark") => "dark".to_string(),
            Ok(_) => "light".to_string(),
            Err(e) => {
                debug!(error = %e, "Theme probe failed, assuming light");
                "light".to_string()
            }
        }
    }

    fn set_startup(&self, enabled: bool) -> Result<(), PlatformError> {
        let path = self.desktop_entry_path()?;
        if enabled {
            let exec = std::env::current_exe()?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, desktop_entry(&exec.to_string_lossy()))?;
        } else if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }

    fn is_startup_enabled(&self) -> Result<bool, PlatformError> {
        Ok(self.desktop_entry_path()?.exists())
    }

    fn open_system_monitor(&self) -> Result<(), PlatformError> {
        let mut last_error = None;
        for program in MONITORS {
            match spawn_detached(program, &[]) {
                Ok(()) => return Ok(()),
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or(PlatformError::Unsupported("system monitor")))
    }
}
