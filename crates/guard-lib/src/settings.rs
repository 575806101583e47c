//! User settings persisted as JSON
//!
//! Only the polling interval lives here. It is stored in nanoseconds under
//! `polling_interval`.

use crate::models::PollingConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// On-disk settings document
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Settings {
    /// Polling interval in nanoseconds
    pub polling_interval: u64,
}

impl From<&PollingConfig> for Settings {
    fn from(config: &PollingConfig) -> Self {
        Self {
            polling_interval: config.interval().as_nanos() as u64,
        }
    }
}

impl From<Settings> for PollingConfig {
    fn from(settings: Settings) -> Self {
        PollingConfig::new(Duration::from_nanos(settings.polling_interval))
    }
}

/// Loads and saves [`Settings`] at a fixed path
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the polling configuration. A missing file yields the default.
    pub fn load(&self) -> Result<PollingConfig> {
        if !self.path.exists() {
            return Ok(PollingConfig::default());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings file {}", self.path.display()))?;
        let settings: Settings = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings file {}", self.path.display()))?;

        Ok(settings.into())
    }

    pub fn save(&self, config: &PollingConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create settings directory")?;
        }

        let content = serde_json::to_string_pretty(&Settings::from(config))
            .context("Failed to serialize settings")?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write settings file {}", self.path.display()))?;

        Ok(())
    }
}

/// `~/.config/ifguard/config.json`
pub fn default_settings_path() -> Result<PathBuf> {
    let home = dirs_next::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("ifguard").join("config.json"))
}

/// `~/.ifguard/logs`
pub fn default_log_dir() -> Result<PathBuf> {
    let home = dirs_next::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".ifguard").join("logs"))
}
