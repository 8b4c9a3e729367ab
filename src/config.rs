//! Configuration management for game-shuffler

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::input::parse_key;
use crate::obs::SourceTransform;

/// Longest time one game may stay on screen
pub const MAX_SWAP_TIME_SECS: u64 = 24 * 60 * 60;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Shuffle timing and window matching
    #[serde(default)]
    pub general: GeneralConfig,

    /// OBS WebSocket integration
    #[serde(default)]
    pub obs: ObsConfig,

    /// Text file exports
    #[serde(default)]
    pub export: ExportConfig,

    /// Operator hotkeys
    #[serde(default)]
    pub hotkeys: HotkeyConfig,

    /// Games in rotation
    #[serde(default)]
    pub games: GamesConfig,

    /// Path to config file (not serialized)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Minimum time a game stays on screen (seconds)
    #[serde(default = "default_min_time")]
    pub min_time: u64,

    /// Maximum time a game stays on screen (seconds)
    #[serde(default = "default_max_time")]
    pub max_time: u64,

    /// Substring every emulator window title carries
    #[serde(default = "default_window_marker")]
    pub window_marker: String,

    /// Countdown after the start key before the first swap (seconds)
    #[serde(default = "default_start_countdown")]
    pub start_countdown_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObsConfig {
    /// Mirror the shown game into OBS source visibility
    #[serde(default)]
    pub obs_integration: bool,

    /// Scene holding one source per game, named after the game title
    #[serde(default = "default_scene_name")]
    pub scene_name: String,

    /// OBS WebSocket host
    #[serde(default = "default_obs_host")]
    pub host: String,

    /// OBS WebSocket port
    #[serde(default = "default_obs_port")]
    pub port: u16,

    /// OBS WebSocket password (optional)
    pub password: Option<String>,

    /// Transform applied to the newly shown source on each swap
    pub active_transform: Option<SourceTransform>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Write the comma-separated list of active games
    #[serde(default)]
    pub export_game_list: bool,

    /// Write the number of active games
    #[serde(default)]
    pub export_num_remaining: bool,

    #[serde(default = "default_game_list_path")]
    pub game_list_path: PathBuf,

    #[serde(default = "default_num_remaining_path")]
    pub num_remaining_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotkeyConfig {
    #[serde(default = "default_pause_key")]
    pub pause_key: String,

    #[serde(default = "default_completion_key")]
    pub completion_key: String,

    #[serde(default = "default_undo_key")]
    pub undo_key: String,

    #[serde(default = "default_start_key")]
    pub start_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamesConfig {
    /// Game titles in display order
    #[serde(default)]
    pub titles: Vec<String>,
}

// Default value functions
fn default_min_time() -> u64 {
    10
}

fn default_max_time() -> u64 {
    30
}

fn default_window_marker() -> String {
    "Dolphin".to_string()
}

fn default_start_countdown() -> u64 {
    5
}

fn default_scene_name() -> String {
    "Dolphin Shuffler".to_string()
}

fn default_obs_host() -> String {
    "localhost".to_string()
}

fn default_obs_port() -> u16 {
    4455
}

fn default_game_list_path() -> PathBuf {
    PathBuf::from("remaining_games.txt")
}

fn default_num_remaining_path() -> PathBuf {
    PathBuf::from("num_remaining.txt")
}

fn default_pause_key() -> String {
    "p".to_string()
}

fn default_completion_key() -> String {
    "space".to_string()
}

fn default_undo_key() -> String {
    "u".to_string()
}

fn default_start_key() -> String {
    "s".to_string()
}

fn sample_titles() -> Vec<String> {
    [
        "Mario Golf: Toadstool Tour",
        "Mario Kart: Double Dash!!",
        "Mario Superstar Baseball",
        "Mario Power Tennis",
        "Super Mario Strikers",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            min_time: default_min_time(),
            max_time: default_max_time(),
            window_marker: default_window_marker(),
            start_countdown_secs: default_start_countdown(),
        }
    }
}

impl Default for ObsConfig {
    fn default() -> Self {
        Self {
            obs_integration: false,
            scene_name: default_scene_name(),
            host: default_obs_host(),
            port: default_obs_port(),
            password: None,
            active_transform: None,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            export_game_list: false,
            export_num_remaining: false,
            game_list_path: default_game_list_path(),
            num_remaining_path: default_num_remaining_path(),
        }
    }
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            pause_key: default_pause_key(),
            completion_key: default_completion_key(),
            undo_key: default_undo_key(),
            start_key: default_start_key(),
        }
    }
}

impl Default for GamesConfig {
    fn default() -> Self {
        Self {
            titles: sample_titles(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            obs: ObsConfig::default(),
            export: ExportConfig::default(),
            hotkeys: HotkeyConfig::default(),
            games: GamesConfig::default(),
            config_path: None,
        }
    }
}

impl Config {
    /// Load configuration from `path` (or the default location),
    /// writing a default file first if none exists
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path()?,
        };

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

            let mut config = Self::from_toml(&contents)
                .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

            config.config_path = Some(config_path);
            Ok(config)
        } else {
            // Create default config
            let config = Config {
                config_path: Some(config_path),
                ..Config::default()
            };
            config.save()?;
            Ok(config)
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = self.config_path()?;

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
            }
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    /// Get the config file path
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => Self::default_config_path(),
        }
    }

    /// Get default config path
    fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = directories::ProjectDirs::from("dev", "game-shuffler", "shuffler")
            .context("Failed to determine config directory")?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Reject configurations the shuffler cannot run with
    pub fn validate(&self) -> Result<()> {
        let general = &self.general;
        if general.min_time == 0 {
            bail!("min_time must be at least 1 second");
        }
        if general.min_time > general.max_time {
            bail!(
                "min_time ({}) must not exceed max_time ({})",
                general.min_time,
                general.max_time
            );
        }
        if general.max_time > MAX_SWAP_TIME_SECS {
            bail!(
                "max_time ({}) must not exceed {} seconds",
                general.max_time,
                MAX_SWAP_TIME_SECS
            );
        }
        if general.window_marker.is_empty() {
            bail!("window_marker must not be empty");
        }

        if self.games.titles.is_empty() {
            bail!("At least one game must be configured under [games] titles");
        }
        let mut seen = HashSet::new();
        for title in &self.games.titles {
            if title.trim().is_empty() {
                bail!("Game titles must not be empty");
            }
            if !seen.insert(title.as_str()) {
                bail!("Game '{}' is configured more than once", title);
            }
        }

        for (name, key) in self.hotkeys.bindings() {
            if parse_key(key).is_none() {
                bail!("Unknown key '{}' for {}", key, name);
            }
        }

        Ok(())
    }

    /// Log the loaded configuration
    pub fn log_summary(&self) {
        use tracing::info;

        info!(
            "Timing: min_time={}s max_time={}s marker={:?}",
            self.general.min_time, self.general.max_time, self.general.window_marker
        );
        info!(
            "OBS: integration={} scene={:?} {}:{} password={}",
            self.obs.obs_integration,
            self.obs.scene_name,
            self.obs.host,
            self.obs.port,
            if self.obs.password.as_deref().unwrap_or("").is_empty() {
                "(none)"
            } else {
                "(hidden)"
            }
        );
        info!(
            "Exports: game_list={} num_remaining={}",
            self.export.export_game_list, self.export.export_num_remaining
        );
        info!(
            "Hotkeys: pause={} complete={} undo={} start={}",
            self.hotkeys.pause_key,
            self.hotkeys.completion_key,
            self.hotkeys.undo_key,
            self.hotkeys.start_key
        );
        for (idx, title) in self.games.titles.iter().enumerate() {
            info!("Game {}: {}", idx + 1, title);
        }
    }
}

impl HotkeyConfig {
    /// (option name, key name) pairs
    pub fn bindings(&self) -> [(&'static str, &str); 4] {
        [
            ("pause_key", self.pause_key.as_str()),
            ("completion_key", self.completion_key.as_str()),
            ("undo_key", self.undo_key.as_str()),
            ("start_key", self.start_key.as_str()),
        ]
    }
}
