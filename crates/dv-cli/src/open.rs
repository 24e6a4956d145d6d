//! Handing links to the desktop.

use std::io;
use std::process::Command;

use tracing::info;

/// Opens a URL outside the terminal.
pub trait LinkOpener {
    fn open(&self, url: &str) -> io::Result<()>;
}

/// Uses the platform's default handler (`open`, `xdg-open`, `start`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

impl LinkOpener for SystemOpener {
    fn open(&self, url: &str) -> io::Result<()> {
        info!("Opening {url}");
        // The handler is detached; its exit status is not awaited.
        system_command(url).spawn().map(|_| ())
    }
}

#[cfg(target_os = "macos")]
fn system_command(url: &str) -> Command {
    let mut command = Command::new("open");
    command.arg(url);
    command
}

#[cfg(target_os = "windows")]
fn system_command(url: &str) -> Command {
    let mut command = Command::new("cmd");
    // `start` treats the first quoted argument as a window title.
    command.args(["/c", "start", "", url]);
    command
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn system_command(url: &str) -> Command {
    let mut command = Command::new("xdg-open");
    command.arg(url);
    command
}
