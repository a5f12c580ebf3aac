//! Configuration for the demo shell.
//!
//! A missing config file is not an error; defaults apply.

use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config directory not found")]
    NoConfigDir,
}

/// Demo shell configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log file path override (None = well-known per-install location)
    pub log_path: Option<PathBuf>,
    /// Watchdog hang threshold in seconds
    pub hang_threshold_secs: f64,
    /// Line count above which log reads return only the recent tail
    pub tail_lines: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_path: None,
            hang_threshold_secs: 4.0,
            tail_lines: 500,
        }
    }
}

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "crashwatch", "crashwatch").map(|p| p.config_dir().to_path_buf())
}

/// Get the config file path
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("config.toml"))
}

/// Load configuration from file
pub fn load_config() -> Result<Config, ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;

    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(&path)?;
    Ok(toml::from_str(&content)?)
}
