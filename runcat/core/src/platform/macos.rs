//! macOS integration

use std::path::PathBuf;

use super::{run_capture, spawn_detached, Platform, PlatformError, APP_ID};

const AGENT_LABEL: &str = "io.github.runcat.agent";
const ACTIVITY_MONITOR: &str = "/System/Applications/Utilities/Activity Monitor.app";

#[derive(Debug, Default)]
pub struct MacPlatform;

impl MacPlatform {
    pub fn new() -> Self {
        Self
    }

    fn plist_path() -> Result<PathBuf, PlatformError> {
        dirs::home_dir()
            .map(|home| {
                home.join("Library")
                    .join("LaunchAgents")
                    .join(format!("{AGENT_LABEL}.plist"))
            })
            .ok_or_else(|| PlatformError::Environment("no home directory".to_string()))
    }
}

fn launch_agent_plist(exec: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{AGENT_LABEL}</string>
    <key>ProgramArguments</key>
    <array>
        <string>{exec}</string>
    </array>
    <key>RunAtLoad</key>
    <true/>
    <key>ProcessType</key>
    <string>Interactive</string>
    <key>AssociatedBundleIdentifiers</key>
    <string>{APP_ID}</string>
</dict>
</plist>
"#
    )
}

impl Platform for MacPlatform {
    fn system_theme(&self) -> String {
        // The key is absent in light mode, which makes `defaults` fail
        match run_capture("defaults", &["read", "-g", "AppleInterfaceStyle"]) {
            Ok(style) if style.trim_start().starts_with("Dark") => "dark".to_string(),
            _ => "light".to_string(),
        }
    }

    fn set_startup(&self, enabled: bool) -> Result<(), PlatformError> {
        let path = Self::plist_path()?;
        let path_str = path.to_string_lossy().into_owned();

        if enabled {
            let exec = std::env::current_exe()?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, launch_agent_plist(&exec.to_string_lossy()))?;
            run_capture("launchctl", &["load", &path_str])?;
        } else if path.exists() {
            run_capture("launchctl", &["unload", &path_str])?;
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }

    fn is_startup_enabled(&self) -> Result<bool, PlatformError> {
        Ok(Self::plist_path()?.exists())
    }

    fn open_system_monitor(&self) -> Result<(), PlatformError> {
        spawn_detached("open", &[ACTIVITY_MONITOR])
    }
}
