use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

use crate::scoring::{ScoringConfig, ScoringOverrides};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid scoring settings:\n  {}", .0.join("\n  "))]
    InvalidScoring(Vec<String>),
}

/// Application configuration loaded from TOML config file.
/// All fields have defaults; the config file is optional.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Custom song store path (overrides XDG default).
    pub db_path: Option<PathBuf>,
    /// How many songs to show.
    pub top_n: usize,
    /// Per-key weight/tolerance overrides.
    pub scoring: ScoringOverrides,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            top_n: 10,
            scoring: ScoringOverrides::default(),
        }
    }
}

impl AppConfig {
    /// Load config from `~/.config/playlist-expert/config.toml`.
    /// Returns default config if file doesn't exist.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Load config from an explicit path.
    /// Logs a warning and falls back to defaults if the file can't be read or parsed.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<AppConfig>(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                Self::default()
            }
        }
    }

    /// Effective scoring tables: built-in defaults plus this file's overrides.
    pub fn scoring_config(&self) -> Result<ScoringConfig, ConfigError> {
        self.scoring
            .validate()
            .map_err(ConfigError::InvalidScoring)?;
        Ok(ScoringConfig::with_overrides(&self.scoring))
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Resolve the default song store path using XDG data directory.
pub fn default_db_path() -> PathBuf {
    if let Some(dirs) = ProjectDirs::from("", "", crate::APP_NAME) {
        dirs.data_dir().join("songs.db")
    } else {
        // Fallback: current directory
        PathBuf::from("songs.db")
    }
}
