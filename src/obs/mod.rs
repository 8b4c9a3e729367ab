//! OBS WebSocket overlay sync

mod overlay;

pub use overlay::*;
