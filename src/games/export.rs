//! Plain-text status exports for stream overlays
//!
//! Each file is overwritten on every registry change so a text source in
//! the streaming software always shows the current state.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, warn};

use super::GameRegistry;
use crate::config::ExportConfig;

/// Writes the active game list and remaining count to files
#[derive(Debug, Clone, Default)]
pub struct ExportSink {
    game_list_path: Option<PathBuf>,
    num_remaining_path: Option<PathBuf>,
}

impl ExportSink {
    pub fn new(game_list_path: Option<PathBuf>, num_remaining_path: Option<PathBuf>) -> Self {
        Self {
            game_list_path,
            num_remaining_path,
        }
    }

    /// Build a sink from config, leaving out disabled exports
    pub fn from_config(config: &ExportConfig) -> Self {
        Self::new(
            config
                .export_game_list
                .then(|| config.game_list_path.clone()),
            config
                .export_num_remaining
                .then(|| config.num_remaining_path.clone()),
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.game_list_path.is_some() || self.num_remaining_path.is_some()
    }

    pub fn write_active_list(&self, titles: &[String]) -> Result<()> {
        let Some(path) = &self.game_list_path else {
            return Ok(());
        };

        std::fs::write(path, titles.join(", "))
            .with_context(|| format!("Failed to write game list: {:?}", path))?;
        debug!("Exported {} active games to {:?}", titles.len(), path);
        Ok(())
    }

    pub fn write_remaining_count(&self, count: usize) -> Result<()> {
        let Some(path) = &self.num_remaining_path else {
            return Ok(());
        };

        std::fs::write(path, format!("Games left: {}", count))
            .with_context(|| format!("Failed to write remaining count: {:?}", path))?;
        Ok(())
    }

    /// Export the registry's current state, logging failures
    pub fn publish(&self, registry: &GameRegistry) {
        if let Err(e) = self.write_active_list(&registry.list_active()) {
            warn!("{:#}", e);
        }
        if let Err(e) = self.write_remaining_count(registry.remaining()) {
            warn!("{:#}", e);
        }
    }
}
