//! Print the default host configuration.

use anyhow::{Context, Result};
use uno_host::Config;

/// Render the default config as TOML.
pub fn run() -> Result<String> {
    Config::default()
        .to_toml()
        .context("Failed to render default config")
}
