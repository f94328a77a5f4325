//! Platform Capabilities
//!
//! Everything that depends on the operating system: the light/dark theme
//! probe, "start at login" registration, and launching the system monitor.
//! One implementation exists per target OS; [`native`] picks it once at
//! startup and the rest of the crate only sees `dyn Platform`.
//!
//! All methods block (they may spawn helper processes). Callers on the async
//! runtime run them through `tokio::task::spawn_blocking`.

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "windows")]
mod windows;

use std::sync::Arc;

use thiserror::Error;

use crate::theme::ThemeProbe;

/// Identifier used for autostart entries
pub const APP_ID: &str = "runcat";

/// Errors from OS integration calls
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The capability does not exist on this OS
    #[error("Not supported on this platform: {0}")]
    Unsupported(&'static str),

    /// A helper command ran but reported failure
    #[error("Command `{command}` failed: {message}")]
    CommandFailed {
        /// Command line that was run
        command: String,
        /// Exit status or stderr
        message: String,
    },

    /// Filesystem or process spawn failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required directory or variable is missing
    #[error("Environment error: {0}")]
    Environment(String),
}

/// OS capability interface
pub trait Platform: Send + Sync {
    /// OS theme, `"light"` or `"dark"`. Never fails; unknown means light.
    fn system_theme(&self) -> String;

    /// Register or unregister the agent to start at login
    ///
    /// # Errors
    ///
    /// Returns `PlatformError` if the OS refuses the change.
    fn set_startup(&self, enabled: bool) -> Result<(), PlatformError>;

    /// Whether the agent is registered to start at login
    ///
    /// # Errors
    ///
    /// Returns `PlatformError` if the registration cannot be inspected.
    fn is_startup_enabled(&self) -> Result<bool, PlatformError>;

    /// Open the OS task manager / activity monitor without waiting for it
    ///
    /// # Errors
    ///
    /// Returns `PlatformError` if the launcher cannot be started.
    fn open_system_monitor(&self) -> Result<(), PlatformError>;
}

impl<P: Platform + ?Sized> ThemeProbe for Arc<P> {
    fn system_theme(&self) -> String {
        (**self).system_theme()
    }
}

/// Theme probe view of a platform
#[must_use]
pub fn theme_probe(platform: &Arc<dyn Platform>) -> Arc<dyn ThemeProbe> {
    Arc::new(Arc::clone(platform))
}

/// The implementation for the OS this binary was built for
#[must_use]
pub fn native() -> Arc<dyn Platform> {
    #[cfg(target_os = "linux")]
    let platform: Arc<dyn Platform> = Arc::new(linux::LinuxPlatform::new());
    #[cfg(target_os = "macos")]
    let platform: Arc<dyn Platform> = Arc::new(macos::MacPlatform::new());
    #[cfg(target_os = "windows")]
    let platform: Arc<dyn Platform> = Arc::new(windows::WindowsPlatform::new());
    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    let platform: Arc<dyn Platform> = Arc::new(UnsupportedPlatform);

    platform
}

/// Fallback for targets without OS integration
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedPlatform;

impl Platform for UnsupportedPlatform {
    fn system_theme(&self) -> String {
        "light".to_string()
    }

    fn set_startup(&self, _enabled: bool) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("start at login"))
    }

    fn is_startup_enabled(&self) -> Result<bool, PlatformError> {
        Err(PlatformError::Unsupported("start at login"))
    }

    fn open_system_monitor(&self) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("system monitor"))
    }
}

/// Run a helper command to completion and return its stdout
#[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
fn run_capture(program: &str, args: &[&str]) -> Result<String, PlatformError> {
    let output = std::process::Command::new(program).args(args).output()?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        Err(PlatformError::CommandFailed {
            command: format!("{program} {}", args.join(" ")),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Start a helper command without waiting for it
#[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
fn spawn_detached(program: &str, args: &[&str]) -> Result<(), PlatformError> {
    spawn_reaped(program, args).map(drop)
}

/// Start a helper command and reap it from a background thread
///
/// The child is waited on so it never lingers as a zombie. The thread's
/// result is the exit status, or `None` if waiting failed.
#[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
fn spawn_reaped(
    program: &str,
    args: &[&str],
) -> Result<std::thread::JoinHandle<Option<std::process::ExitStatus>>, PlatformError> {
    let mut child = std::process::Command::new(program).args(args).spawn()?;
    let name = program.to_string();
    let reaper = std::thread::Builder::new()
        .name("runcat-reaper".to_string())
        .spawn(move || match child.wait() {
            Ok(status) => {
                tracing::debug!(program = %name, %status, "Helper exited");
                Some(status)
            }
            Err(e) => {
                tracing::warn!(program = %name, error = %e, "Failed to wait for helper");
                None
            }
        })?;
    Ok(reaper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(any(target_os = "linux", target_os = "macos"))]
    #[test]
    fn test_detached_helper_is_reaped() {
        let reaper = spawn_reaped("true", &[]).unwrap();
        let status = reaper.join().unwrap();
        assert!(status.is_some_and(|s| s.success()));
    }

    #[cfg(any(target_os = "linux", target_os = "macos"))]
    #[test]
    fn test_missing_helper_is_io_error() {
        assert!(matches!(
            spawn_reaped("runcat-no-such-helper", &[]),
            Err(PlatformError::Io(_))
        ));
    }

    #[test]
    fn test_unsupported_platform_is_fail_safe() {
        let platform = UnsupportedPlatform;
        assert_eq!(platform.system_theme(), "light");
        assert!(matches!(
            platform.set_startup(true),
            Err(PlatformError::Unsupported(_))
        ));
        assert!(platform.is_startup_enabled().is_err());
        assert!(platform.open_system_monitor().is_err());
    }

    #[test]
    fn test_theme_probe_view() {
        let platform: Arc<dyn Platform> = Arc::new(UnsupportedPlatform);
        let probe = theme_probe(&platform);
        assert_eq!(probe.system_theme(), "light");
    }
}
