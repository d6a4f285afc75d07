//! Configuration loading for the host.
//!
//! Configuration is loaded from a TOML file. Every field has a default, so
//! an empty file (or no file at all) yields a working host.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uno_core::{RulesConfig, DECK_SIZE};

/// Root configuration for the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Table rules.
    #[serde(default)]
    pub game: RulesConfig,
    /// Runtime sizing.
    #[serde(default)]
    pub server: ServerConfig,
    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Runtime sizing for the authority task and link sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Intents that may queue for the authority before senders wait (default: 256).
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
    /// Outbound frames buffered per link (default: 64).
    #[serde(default = "default_link_buffer")]
    pub link_buffer: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset (default: "info").
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

// Default value functions
fn default_mailbox_capacity() -> usize {
    256
}

fn default_link_buffer() -> usize {
    64
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: default_mailbox_capacity(),
            link_buffer: default_link_buffer(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or describes a
    /// table that cannot be dealt.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::SerializeError)
    }

    /// Check that the values describe a playable table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let game = &self.game;
        if game.hand_size == 0 {
            return Err(ConfigError::Invalid("game.hand_size must be at least 1".into()));
        }
        if game.min_players < 2 {
            return Err(ConfigError::Invalid(
                "game.min_players must be at least 2".into(),
            ));
        }
        if game.max_players < game.min_players {
            return Err(ConfigError::Invalid(format!(
                "game.max_players ({}) is below game.min_players ({})",
                game.max_players, game.min_players
            )));
        }
        let needed = game.max_players * game.hand_size + 1;
        if needed > DECK_SIZE {
            return Err(ConfigError::Invalid(format!(
                "{} players with {} cards each need {needed} cards; the deck has {DECK_SIZE}",
                game.max_players, game.hand_size
            )));
        }
        if self.server.mailbox_capacity == 0 || self.server.link_buffer == 0 {
            return Err(ConfigError::Invalid(
                "server.mailbox_capacity and server.link_buffer must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// Failed to render configuration.
    #[error("failed to serialize config: {0}")]
    SerializeError(#[source] toml::ser::Error),
    /// Values are out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}
