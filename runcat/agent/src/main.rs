//! RunCat Agent
//!
//! Long-running background process that animates a runner in the system
//! tray, paced by CPU load.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: ~/.config/runcat/agent.toml, built-in frames
//! runcat-agent
//!
//! # Frames from a directory holding an assets/ tree
//! RUNCAT_ASSETS_DIR=/opt/runcat runcat-agent
//!
//! # With verbose logging
//! RUST_LOG=debug runcat-agent
//! ```
//!
//! # Environment Variables
//!
//! - `RUNCAT_ASSETS_DIR`: directory containing the `assets/` tree
//! - `RUNCAT_SAMPLE_INTERVAL`: CPU sampling period in seconds (>= 1)
//! - `RUNCAT_THEME_POLL_INTERVAL`: OS theme poll period in seconds (>= 1)
//! - `RUNCAT_SETTINGS_PATH`: user settings file
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)
//!
//! # Tray
//!
//! Built with `--features tray`, the agent shows a real system tray icon on
//! Linux and Windows. Without it, or when the desktop has no tray, icon and
//! menu updates are logged and the menu is driven by stdin commands.
//!
//! # Signals
//!
//! - SIGTERM/SIGINT: Graceful shutdown (sampler, animation, then tray)

mod commands;
mod log_surface;
#[cfg(all(feature = "tray", any(target_os = "linux", target_os = "windows")))]
mod native_tray;
mod tray;

use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::sync::{mpsc, Notify};
use tracing::{error, info};

use runcat_core::{load_config, App, AppParts, MenuEvent, TrayThread};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("runcat_agent=info".parse()?)
                .add_directive("runcat_core=info".parse()?),
        )
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting runcat agent");

    let config = load_config().context("Failed to load agent configuration")?;
    info!(
        source = %config.source(),
        assets = %config
            .assets_dir
            .as_ref()
            .map_or_else(|| "built-in".to_string(), |dir| dir.display().to_string()),
        settings = %config.settings_path.display(),
        sample_interval_secs = config.sample_interval.as_secs(),
        "Configuration loaded"
    );

    // Unified click stream; the sender is held here so a closed stdin does
    // not end the dispatch loop
    let (event_tx, event_rx) = mpsc::unbounded_channel::<MenuEvent>();

    let clicks = event_tx.clone();
    let tray =
        TrayThread::spawn(move || tray::open(clicks)).context("Failed to start tray thread")?;

    let parts = AppParts::native(&config);
    let app = App::new(config, parts, tray.handle());

    commands::spawn_stdin_reader(event_tx.clone()).context("Failed to start stdin reader")?;

    app.start().await;

    // Spawn a task to handle shutdown signals
    let shutdown_notify = Arc::new(Notify::new());
    let shutdown_clone = Arc::clone(&shutdown_notify);
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown_clone.notify_one();
    });

    info!("Ready");

    tokio::select! {
        () = app.run(event_rx) => {
            info!("Quit selected, shutting down");
        }
        () = shutdown_notify.notified() => {}
    }

    // Graceful shutdown
    info!("Performing graceful shutdown...");
    app.shutdown();
    drop(event_tx);
    tokio::task::spawn_blocking(move || tray.shutdown())
        .await
        .context("Tray thread shutdown failed")?;

    info!("runcat agent stopped cleanly");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed is logged and never fires.
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        () = terminate => {
            info!("Received SIGTERM, shutting down");
        }
    }
}
