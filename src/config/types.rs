//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use super::limits::ChannelLimitsConfig;
use super::vchans::VchanConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Channel engine configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server identity.
    #[serde(default)]
    pub server: ServerConfig,
    /// Channel limits.
    #[serde(default)]
    pub channels: ChannelLimitsConfig,
    /// Virtual channel overlay.
    #[serde(default)]
    pub vchans: VchanConfig,
    /// Periodic reap sweep.
    #[serde(default)]
    pub reaper: ReaperConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name (e.g., "irc.straylight.net").
    ///
    /// Mode changes made by servers, and privileged changes hidden by +a,
    /// are attributed to this name.
    #[serde(default = "default_server_name")]
    pub name: String,
    /// Three-character server ID prefixed to local UIDs (default: "001").
    #[serde(default = "default_sid")]
    pub sid: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            sid: default_sid(),
        }
    }
}

fn default_server_name() -> String {
    "irc.straylight.net".to_string()
}

fn default_sid() -> String {
    "001".to_string()
}

/// Reap sweep configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReaperConfig {
    /// Seconds between sweeps for empty channels (default: 60).
    #[serde(default = "default_reap_interval")]
    pub interval_secs: u64,
}

impl ReaperConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_reap_interval(),
        }
    }
}

fn default_reap_interval() -> u64 {
    60
}
