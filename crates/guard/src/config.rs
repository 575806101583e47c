//! Process configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Guard configuration, read from `IFGUARD_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct GuardConfig {
    /// Interface to keep down
    #[serde(default = "default_interface")]
    pub interface: String,

    /// Directory for daily event logs (default: ~/.ifguard/logs)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Settings file (default: ~/.config/ifguard/config.json)
    #[serde(default)]
    pub settings_path: Option<PathBuf>,

    /// Bind address for the status API
    #[serde(default = "default_api_bind")]
    pub api_bind: String,

    /// Port for the status API
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Upper bound for re-enabling the interface on exit
    #[serde(default = "default_restore_timeout_ms")]
    pub restore_timeout_ms: u64,

    /// Run state changes through `sudo`
    #[serde(default = "default_use_sudo")]
    pub use_sudo: bool,

    /// Start even when not running as root
    #[serde(default)]
    pub allow_unprivileged: bool,

    /// Evict index entries older than this many seconds (unbounded if unset)
    #[serde(default)]
    pub index_retention_secs: Option<u64>,
}

fn default_interface() -> String {
    guard_lib::monitor::DEFAULT_INTERFACE.to_string()
}

fn default_api_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    7373
}

fn default_restore_timeout_ms() -> u64 {
    5000
}

fn default_use_sudo() -> bool {
    true
}

impl GuardConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        Self::from_builder(
            config::Config::builder()
                .add_source(config::Environment::with_prefix("IFGUARD").try_parsing(true)),
        )
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self> {
        builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn log_dir(&self) -> Result<PathBuf> {
        match &self.log_dir {
            Some(dir) => Ok(dir.clone()),
            None => guard_lib::settings::default_log_dir(),
        }
    }

    pub fn settings_path(&self) -> Result<PathBuf> {
        match &self.settings_path {
            Some(path) => Ok(path.clone()),
            None => guard_lib::settings::default_settings_path(),
        }
    }

    pub fn api_addr(&self) -> String {
        format!("{}:{}", self.api_bind, self.api_port)
    }

    /// Command prefix for state changes. Root needs none.
    pub fn privilege_prefix(&self, is_root: bool) -> Option<String> {
        (self.use_sudo && !is_root).then(|| "sudo".to_string())
    }

    pub fn restore_timeout(&self) -> Duration {
        Duration::from_millis(self.restore_timeout_ms)
    }

    pub fn index_retention(&self) -> Option<Duration> {
        self.index_retention_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GuardConfig::from_builder(config::Config::builder()).unwrap();

        assert_eq!(config.interface, "awdl0");
        assert_eq!(config.api_addr(), "127.0.0.1:7373");
        assert_eq!(config.restore_timeout(), Duration::from_secs(5));
        assert!(config.use_sudo);
        assert!(!config.allow_unprivileged);
        assert!(config.log_dir.is_none());
        assert!(config.index_retention().is_none());
    }

    #[test]
    fn test_overrides() {
        let builder = config::Config::builder()
            .set_override("interface", "en0")
            .unwrap()
            .set_override("log_dir", "/tmp/ifguard-logs")
            .unwrap()
            .set_override("api_port", 9000)
            .unwrap()
            .set_override("restore_timeout_ms", 250)
            .unwrap()
            .set_override("index_retention_secs", 86400)
            .unwrap();
        let config = GuardConfig::from_builder(builder).unwrap();

        assert_eq!(config.interface, "en0");
        assert_eq!(config.log_dir().unwrap(), PathBuf::from("/tmp/ifguard-logs"));
        assert_eq!(config.api_addr(), "127.0.0.1:9000");
        assert_eq!(config.restore_timeout(), Duration::from_millis(250));
        assert_eq!(config.index_retention(), Some(Duration::from_secs(86400)));
    }

    #[test]
    fn test_sudo_prefix_dropped_for_root() {
        let config = GuardConfig::from_builder(config::Config::builder()).unwrap();
        assert_eq!(config.privilege_prefix(false).as_deref(), Some("sudo"));
        assert_eq!(config.privilege_prefix(true), None);

        let builder = config::Config::builder()
            .set_override("use_sudo", false)
            .unwrap();
        let config = GuardConfig::from_builder(builder).unwrap();
        assert_eq!(config.privilege_prefix(false), None);
    }
}
