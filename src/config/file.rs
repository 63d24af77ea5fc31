//! Configuration file management for sudovoice.
//!
//! The optional file `~/.config/sudovoice/sudovoice.toml` selects audio devices.
//! Encoding settings are fixed and never read from it.

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Audio device selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Input device to record from. Options:
    /// - "default" for system default device
    /// - numeric index (0, 1, 2, etc.) from `sudovoice list-devices`
    /// - device name from `sudovoice list-devices`
    #[serde(default = "default_device")]
    pub input_device: String,
    /// Output device to play back on; same options as `input_device`
    #[serde(default = "default_device")]
    pub output_device: String,
}

fn default_device() -> String {
    "default".to_string()
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_device: default_device(),
            output_device: default_device(),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SudovoiceConfig {
    #[serde(default)]
    pub audio: AudioConfig,
}

impl SudovoiceConfig {
    /// Loads configuration from the user's config directory, or defaults when there
    /// is no config file.
    ///
    /// # Errors
    /// - If the home directory cannot be determined
    /// - If the file exists but cannot be read or parsed
    pub fn load() -> anyhow::Result<Self> {
        let config_path = get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Loads configuration from `path`; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: SudovoiceConfig = toml::from_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(config)
    }
}

/// Path of the config file; it does not have to exist.
pub fn get_config_path() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))?;
    Ok(home.join(".config").join("sudovoice").join("sudovoice.toml"))
}
