//! TOML configuration for the gridmatch service.

use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_new::new;
use gridmatch_rules::MAX_BOARD_SIZE;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

use crate::chaos::{DEFAULT_CHAOS_PERIOD, DEFAULT_CHAOS_PROBABILITY};

/// Environment variable that overrides `database_url`.
pub const DATABASE_URL_ENV: &str = "GRIDMATCH_DATABASE_URL";

/// Top-level service configuration.
#[derive(Debug, Clone, PartialEq, Getters, Serialize, Deserialize, new)]
pub struct GameConfig {
    /// Path of the SQLite database file.
    #[serde(default = "default_database_url")]
    database_url: String,

    /// Default board parameters for new matches.
    #[serde(default)]
    board: BoardConfig,

    /// Chaos rule parameters.
    #[serde(default)]
    chaos: ChaosConfig,
}

/// Board dimension and run length used when a match does not specify them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters, Serialize, Deserialize, new)]
pub struct BoardConfig {
    /// Board dimension.
    #[serde(default = "default_size")]
    size: u32,

    /// Marks in a row needed to win.
    #[serde(default = "default_win_length")]
    win_length: u32,
}

/// Chaos rule parameters.
#[derive(Debug, Clone, Copy, PartialEq, Getters, Serialize, Deserialize, new)]
pub struct ChaosConfig {
    /// Every `period`-th move is eligible; 0 disables the rule.
    #[serde(default = "default_period")]
    period: u32,

    /// Flip probability for an eligible move.
    #[serde(default = "default_probability")]
    probability: f64,

    /// Fixed generator seed.
    #[serde(default)]
    seed: Option<u64>,
}

#[instrument]
fn default_database_url() -> String {
    "gridmatch.db".to_string()
}

#[instrument]
fn default_size() -> u32 {
    3
}

#[instrument]
fn default_win_length() -> u32 {
    3
}

#[instrument]
fn default_period() -> u32 {
    DEFAULT_CHAOS_PERIOD
}

#[instrument]
fn default_probability() -> f64 {
    DEFAULT_CHAOS_PROBABILITY
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            board: BoardConfig::default(),
            chaos: ChaosConfig::default(),
        }
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            size: default_size(),
            win_length: default_win_length(),
        }
    }
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            period: default_period(),
            probability: default_probability(),
            seed: None,
        }
    }
}

impl GameConfig {
    /// Parses and validates configuration from TOML text.
    #[instrument(skip(content))]
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        let config = Self::from_toml(&content)?;
        info!(database_url = %config.database_url, "Config loaded successfully");
        Ok(config)
    }

    /// Loads the file if it exists, otherwise uses defaults, then applies
    /// the `GRIDMATCH_DATABASE_URL` override.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = if path.as_ref().exists() {
            Self::from_file(path)?
        } else {
            warn!("Config file not found, using defaults");
            Self::default()
        };
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            debug!(database_url = %url, "Database URL overridden by environment");
            config.database_url = url;
        }
        Ok(config)
    }

    /// Replaces the database location.
    pub fn with_database_url(mut self, database_url: impl Into<String>) -> Self {
        self.database_url = database_url.into();
        self
    }

    /// Checks board and chaos parameters for consistency.
    #[instrument(skip(self))]
    pub fn validate(&self) -> Result<(), ConfigError> {
        let BoardConfig { size, win_length } = self.board;
        if size == 0 || size > MAX_BOARD_SIZE {
            return Err(ConfigError::new(format!(
                "board.size must be between 1 and {}, got {}",
                MAX_BOARD_SIZE, size
            )));
        }
        if win_length == 0 || win_length > size {
            return Err(ConfigError::new(format!(
                "board.win_length must be between 1 and {}, got {}",
                size, win_length
            )));
        }
        let probability = self.chaos.probability;
        if !(0.0..=1.0).contains(&probability) {
            return Err(ConfigError::new(format!(
                "chaos.probability must be within [0, 1], got {}",
                probability
            )));
        }
        Ok(())
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
