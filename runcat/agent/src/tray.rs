//! Picks the tray surface for this build
//!
//! The native widget when the `tray` feature is compiled in and the desktop
//! accepts it, the logging surface otherwise.

use runcat_core::{MenuEvent, TraySurface};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::log_surface::LogSurface;

/// Open the surface on the calling (tray) thread
///
/// Menu clicks on a native widget are sent to `events`.
pub fn open(events: mpsc::UnboundedSender<MenuEvent>) -> Box<dyn TraySurface> {
    match native(events) {
        Ok(Some(surface)) => {
            info!("Using the system tray");
            surface
        }
        Ok(None) => {
            info!("Built without the system tray, logging tray updates");
            Box::new(LogSurface::new())
        }
        Err(e) => {
            warn!(error = %e, "System tray unavailable, logging tray updates");
            Box::new(LogSurface::new())
        }
    }
}

#[cfg(all(feature = "tray", any(target_os = "linux", target_os = "windows")))]
fn native(
    events: mpsc::UnboundedSender<MenuEvent>,
) -> anyhow::Result<Option<Box<dyn TraySurface>>> {
    let tray = crate::native_tray::NativeTray::new(events)?;
    Ok(Some(Box::new(tray)))
}

#[cfg(all(feature = "tray", target_os = "macos"))]
fn native(
    _events: mpsc::UnboundedSender<MenuEvent>,
) -> anyhow::Result<Option<Box<dyn TraySurface>>> {
    anyhow::bail!("the macOS status bar must be driven from the main thread")
}

#[cfg(not(all(
    feature = "tray",
    any(target_os = "linux", target_os = "windows", target_os = "macos")
)))]
fn native(
    _events: mpsc::UnboundedSender<MenuEvent>,
) -> anyhow::Result<Option<Box<dyn TraySurface>>> {
    Ok(None)
}
