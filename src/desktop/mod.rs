//! Desktop window access
//!
//! Finds emulator windows by title and moves focus between them. The
//! scheduler only sees the two traits; each platform provides one
//! backend implementing both.

#[cfg(target_os = "linux")]
mod x11;

#[cfg(target_os = "windows")]
mod win32;

use anyhow::Result;
use std::fmt;
use thiserror::Error;

/// Opaque OS window identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub u64);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A visible window running one of the configured games
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameWindow {
    pub handle: WindowHandle,
    pub title: String,
}

impl GameWindow {
    pub fn new(handle: WindowHandle, title: impl Into<String>) -> Self {
        Self {
            handle,
            title: title.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DesktopError {
    #[error("window {0} not found")]
    NotFound(WindowHandle),

    #[error("window backend failed: {0}")]
    Backend(String),
}

/// Enumerates visible emulator windows
pub trait WindowLocator: Send + Sync {
    /// Visible windows whose text contains the emulator marker and one
    /// of `active_titles`
    fn enumerate(&self, active_titles: &[String]) -> Vec<GameWindow>;
}

/// Moves focus between game windows
pub trait WindowFocus: Send + Sync {
    /// Restore and bring a window to the foreground
    fn focus(&self, handle: WindowHandle) -> Result<(), DesktopError>;

    /// Minimize a window. Best effort, failures are only logged.
    fn minimize(&self, handle: WindowHandle);
}

/// Match a window's text against the active titles.
///
/// The marker must be present. When several titles are contained in the
/// text the longest one wins, so a window maps to at most one game.
pub fn match_title<'a>(
    window_text: &str,
    active_titles: &'a [String],
    marker: &str,
) -> Option<&'a str> {
    if !window_text.contains(marker) {
        return None;
    }

    active_titles
        .iter()
        .filter(|title| !title.is_empty() && window_text.contains(title.as_str()))
        .max_by_key(|title| title.len())
        .map(|title| title.as_str())
}

/// Create the window backend for the current platform
pub fn create_desktop(marker: &str) -> Result<(Box<dyn WindowLocator>, Box<dyn WindowFocus>)> {
    #[cfg(target_os = "windows")]
    {
        tracing::info!("Using Win32 window backend");
        let desktop = win32::Win32Desktop::new(marker);
        let locator: Box<dyn WindowLocator> = Box::new(desktop.clone());
        let focus: Box<dyn WindowFocus> = Box::new(desktop);
        return Ok((locator, focus));
    }

    #[cfg(target_os = "linux")]
    {
        if std::env::var("XDG_SESSION_TYPE")
            .map(|s| s == "wayland")
            .unwrap_or(false)
        {
            tracing::warn!("Wayland session detected, xdotool only sees XWayland windows");
        }
        tracing::info!("Using xdotool window backend");
        let desktop = x11::XdotoolDesktop::new(marker);
        let locator: Box<dyn WindowLocator> = Box::new(desktop.clone());
        let focus: Box<dyn WindowFocus> = Box::new(desktop);
        return Ok((locator, focus));
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux")))]
    {
        let _ = marker;
        anyhow::bail!("Window switching is not supported on this platform");
    }
}
