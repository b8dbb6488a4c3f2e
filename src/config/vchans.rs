//! Virtual channel overlay configuration.

use serde::Deserialize;

/// Virtual channel (vchan) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct VchanConfig {
    /// Allow sub-channels to be forked from a root channel (default: true).
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Sub-channels per root channel (default: 8).
    #[serde(default = "default_max_per_channel")]
    pub max_per_channel: usize,
    /// Seconds an empty sub-channel survives before reaping (default: 3600).
    #[serde(default = "default_grace")]
    pub grace_secs: i64,
    /// Timestamp increments tried when a generated name collides (default: 64).
    #[serde(default = "default_max_ts_delta")]
    pub max_ts_delta: i64,
}

impl Default for VchanConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_per_channel: default_max_per_channel(),
            grace_secs: default_grace(),
            max_ts_delta: default_max_ts_delta(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_max_per_channel() -> usize {
    8
}

fn default_grace() -> i64 {
    60 * 60
}

fn default_max_ts_delta() -> i64 {
    64
}
