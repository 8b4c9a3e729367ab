//! Game registry and status exports

mod export;
mod registry;

pub use export::ExportSink;
pub use registry::*;
