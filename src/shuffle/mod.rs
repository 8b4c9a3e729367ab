//! Shuffle engine - selection policy, operator signals and the scheduler loop

mod policy;
mod scheduler;
mod signals;

pub use scheduler::{OverlayTarget, RunOutcome, Scheduler, Timing};
pub use signals::{Signal, SignalFlags};
