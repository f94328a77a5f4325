//! Text commands on stdin
//!
//! Each stdin line is turned into the menu event the matching click would
//! produce, so a headless agent can still be driven:
//!
//! ```text
//! runner horse | theme dark | speed cpu20 | autostart | monitor | about | quit
//! ```

use std::io::{self, BufRead};
use std::thread;

use runcat_core::{Creature, MenuEvent, MenuItemId, SpeedPolicy, ThemeMode};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Parse one line. Blank lines yield `None`.
///
/// # Errors
///
/// Returns a message describing the unknown command or argument.
pub fn parse_command(line: &str) -> Result<Option<MenuEvent>, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();

    let event = match (command.to_lowercase().as_str(), arg) {
        ("runner", Some(name)) => MenuItemId::Creature(name.parse::<Creature>()?),
        ("theme", Some(name)) => MenuItemId::Theme(name.parse::<ThemeMode>()?),
        ("speed", Some(name)) => MenuItemId::Speed(name.parse::<SpeedPolicy>()?),
        ("runner" | "theme" | "speed", None) => {
            return Err(format!("`{command}` needs an argument"));
        }
        ("autostart", _) => MenuItemId::Autostart,
        ("monitor", _) => MenuItemId::SystemMonitor,
        ("about", _) => MenuItemId::About,
        ("quit" | "exit", _) => MenuItemId::Quit,
        (other, _) => return Err(format!("unknown command `{other}`")),
    };
    Ok(Some(event))
}

/// Forward stdin commands as menu events from a background thread
///
/// The thread ends at EOF or when the event stream is closed. It is not
/// joined; process exit takes it down.
pub fn spawn_stdin_reader(events: mpsc::UnboundedSender<MenuEvent>) -> io::Result<()> {
    thread::Builder::new()
        .name("runcat-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(error = %e, "Failed to read stdin");
                        break;
                    }
                };
                match parse_command(&line) {
                    Ok(Some(event)) => {
                        if events.send(event).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(message) => warn!(input = %line.trim(), "{message}"),
                }
            }
            debug!("Stdin reader finished");
        })?;
    Ok(())
}
