//! Operator signals shared between the hotkey thread and the scheduler
//!
//! The hotkey context only raises flags; the scheduler reads and clears
//! them once per tick.

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Operator intents delivered by hotkeys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    PauseToggle,
    MarkDone,
    Undo,
    Start,
}

/// Flags crossing the hotkey/scheduler boundary
#[derive(Debug, Default)]
pub struct SignalFlags {
    paused: AtomicBool,
    mark_done: AtomicBool,
    undo: AtomicBool,
    started: AtomicBool,
    shutdown: AtomicBool,
}

impl SignalFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a signal. Mark-done and undo are dropped while paused.
    pub fn raise(&self, signal: Signal) {
        match signal {
            Signal::PauseToggle => {
                let was_paused = self.paused.fetch_xor(true, Ordering::SeqCst);
                if was_paused {
                    info!("Shuffler resumed");
                } else {
                    info!("Shuffler paused");
                }
            }
            Signal::MarkDone => {
                if !self.is_paused() {
                    self.mark_done.store(true, Ordering::SeqCst);
                }
            }
            Signal::Undo => {
                if !self.is_paused() {
                    self.undo.store(true, Ordering::SeqCst);
                }
            }
            Signal::Start => {
                self.started.store(true, Ordering::SeqCst);
            }
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Consume a pending mark-done request
    pub fn take_mark_done(&self) -> bool {
        self.mark_done.swap(false, Ordering::SeqCst)
    }

    /// Consume a pending undo request
    pub fn take_undo(&self) -> bool {
        self.undo.swap(false, Ordering::SeqCst)
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}
