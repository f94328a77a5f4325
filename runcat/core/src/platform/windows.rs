//! Windows integration through `reg.exe`

use super::{run_capture, spawn_detached, Platform, PlatformError, APP_ID};

const PERSONALIZE_KEY: &str =
    r"HKCU\Software\Microsoft\Windows\CurrentVersion\Themes\Personalize";
const RUN_KEY: &str = r"HKCU\Software\Microsoft\Windows\CurrentVersion\Run";

#[derive(Debug, Default)]
pub struct WindowsPlatform;

impl WindowsPlatform {
    pub fn new() -> Self {
        Self
    }
}

/// Parse the DWORD out of `reg query` output, e.g. `    AppsUseLightTheme    REG_DWORD    0x0`
fn parse_dword(output: &str, value: &str) -> Option<u32> {
    output
        .lines()
        .find(|line| line.trim_start().starts_with(value))
        .and_then(|line| line.split_whitespace().last())
        .and_then(|hex| u32::from_str_radix(hex.trim_start_matches("0x"), 16).ok())
}

impl Platform for WindowsPlatform {
    fn system_theme(&self) -> String {
        let light = run_capture("reg", &["query", PERSONALIZE_KEY, "/v", "AppsUseLightTheme"])
            .ok()
            .and_then(|out| parse_dword(&out, "AppsUseLightTheme"));
        match light {
            Some(0) => "dark".to_string(),
            _ => "light".to_string(),
        }
    }

    fn set_startup(&self, enabled: bool) -> Result<(), PlatformError> {
        if enabled {
            let exec = std::env::current_exe()?;
            let quoted = format!("\"{}\"", exec.to_string_lossy());
            run_capture(
                "reg",
                &["add", RUN_KEY, "/v", APP_ID, "/t", "REG_SZ", "/d", &quoted, "/f"],
            )?;
        } else if self.is_startup_enabled()? {
            run_capture("reg", &["delete", RUN_KEY, "/v", APP_ID, "/f"])?;
        }
        Ok(())
    }

    fn is_startup_enabled(&self) -> Result<bool, PlatformError> {
        match run_capture("reg", &["query", RUN_KEY, "/v", APP_ID]) {
            Ok(_) => Ok(true),
            // reg.exe exits non-zero when the value does not exist
            Err(PlatformError::CommandFailed { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn open_system_monitor(&self) -> Result<(), PlatformError> {
        spawn_detached("taskmgr.exe", &[])
    }
}
