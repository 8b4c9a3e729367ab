//! Operator hotkeys

mod hotkeys;
mod keys;

pub use hotkeys::HotkeyRouter;
pub use keys::parse_key;
