//! rdev-based hotkey router
//! Works on Windows, macOS, and Linux (X11)

use anyhow::{Context, Result};
use rdev::{Event, EventType, Key};
use std::fmt::Debug;
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info};

use super::parse_key;
use crate::config::HotkeyConfig;
use crate::shuffle::{Signal, SignalFlags};

/// Maps configured keys to operator signals
#[derive(Debug, Clone)]
pub struct HotkeyRouter {
    bindings: Vec<(Key, Signal)>,
}

impl HotkeyRouter {
    pub fn from_config(config: &HotkeyConfig) -> Result<Self> {
        let pairs = [
            (config.pause_key.as_str(), Signal::PauseToggle),
            (config.completion_key.as_str(), Signal::MarkDone),
            (config.undo_key.as_str(), Signal::Undo),
            (config.start_key.as_str(), Signal::Start),
        ];

        let bindings = pairs
            .into_iter()
            .map(|(name, signal)| {
                parse_key(name)
                    .map(|key| (key, signal))
                    .with_context(|| format!("Unknown hotkey '{}' for {:?}", name, signal))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { bindings })
    }

    /// Signal bound to a key, if any
    pub fn route(&self, key: Key) -> Option<Signal> {
        self.bindings
            .iter()
            .find(|(bound, _)| *bound == key)
            .map(|(_, signal)| *signal)
    }

    /// Listen for key presses on a background thread and raise the
    /// matching signals
    pub fn spawn(self, flags: Arc<SignalFlags>) -> Result<()> {
        thread::Builder::new()
            .name("hotkeys".to_string())
            .spawn(move || {
                // rdev must not dispatch TSM calls from this thread on macOS
                rdev::set_is_main_thread(false);
                self.listen_with(flags, |callback| rdev::listen(callback));
            })
            .context("Failed to spawn hotkey listener thread")?;

        Ok(())
    }

    /// Run `listen` with a callback that routes key presses into `flags`.
    ///
    /// Without a listener no start key can ever arrive, so a listener
    /// failure requests shutdown.
    fn listen_with<L, E>(self, flags: Arc<SignalFlags>, listen: L)
    where
        L: FnOnce(Box<dyn FnMut(Event)>) -> Result<(), E>,
        E: Debug,
    {
        info!("Hotkey listener started");

        let callback_flags = flags.clone();
        let callback = move |event: Event| {
            if let EventType::KeyPress(key) = event.event_type {
                if let Some(signal) = self.route(key) {
                    debug!("Hotkey {:?} -> {:?}", key, signal);
                    callback_flags.raise(signal);
                }
            }
        };

        match listen(Box::new(callback)) {
            Ok(()) => info!("Hotkey listener stopped"),
            Err(e) => {
                error!("Hotkey listener failed: {:?}", e);
                flags.request_shutdown();
            }
        }
    }
}
