//! X11 window backend driven through `xdotool`

use std::process::Command;
use tracing::{debug, warn};

use super::{match_title, DesktopError, GameWindow, WindowFocus, WindowHandle, WindowLocator};

#[derive(Debug, Clone)]
pub struct XdotoolDesktop {
    marker: String,
    /// `marker` as a literal `xdotool search` regex
    name_pattern: String,
}

impl XdotoolDesktop {
    pub fn new(marker: &str) -> Self {
        Self {
            marker: marker.to_string(),
            name_pattern: escape_regex(marker),
        }
    }

    fn xdotool(args: &[&str]) -> Result<String, DesktopError> {
        let output = Command::new("xdotool")
            .args(args)
            .output()
            .map_err(|e| DesktopError::Backend(format!("failed to run xdotool: {}", e)))?;

        if !output.status.success() {
            return Err(DesktopError::Backend(format!(
                "xdotool {} exited with {}",
                args.join(" "),
                output.status
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn window_name(id: u64) -> Option<String> {
        let id = id.to_string();
        Self::xdotool(&["getwindowname", id.as_str()])
            .ok()
            .map(|s| s.trim().to_string())
    }
}

impl WindowLocator for XdotoolDesktop {
    fn enumerate(&self, active_titles: &[String]) -> Vec<GameWindow> {
        // xdotool exits non-zero when nothing matches
        let ids = match Self::xdotool(&["search", "--onlyvisible", "--name", self.name_pattern.as_str()]) {
            Ok(stdout) => stdout,
            Err(e) => {
                debug!("No windows found for marker {:?}: {}", self.marker, e);
                return Vec::new();
            }
        };

        ids.lines()
            .filter_map(|line| line.trim().parse::<u64>().ok())
            .filter_map(|id| {
                let name = Self::window_name(id)?;
                let title = match_title(&name, active_titles, &self.marker)?;
                Some(GameWindow::new(WindowHandle(id), title))
            })
            .collect()
    }
}

impl WindowFocus for XdotoolDesktop {
    fn focus(&self, handle: WindowHandle) -> Result<(), DesktopError> {
        let id = handle.0.to_string();
        Self::xdotool(&["windowactivate", "--sync", id.as_str()])
            .map(|_| ())
            .map_err(|e| match Self::window_name(handle.0) {
                Some(_) => e,
                None => DesktopError::NotFound(handle),
            })
    }

    fn minimize(&self, handle: WindowHandle) {
        let id = handle.0.to_string();
        if let Err(e) = Self::xdotool(&["windowminimize", id.as_str()]) {
            warn!("Failed to minimize window {}: {}", handle, e);
        }
    }
}

/// Backslash-escape POSIX extended regex metacharacters
fn escape_regex(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if "\\.^$|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_metacharacters_are_escaped() {
        assert_eq!(escape_regex("Dolphin (x64)"), r"Dolphin \(x64\)");
        assert_eq!(escape_regex("Dolphin 5.0+"), r"Dolphin 5\.0\+");
        assert_eq!(escape_regex(r"a\b"), r"a\\b");
    }

    #[test]
    fn test_plain_marker_is_unchanged() {
        let desktop = XdotoolDesktop::new("Dolphin");
        assert_eq!(desktop.name_pattern, "Dolphin");
    }
}
