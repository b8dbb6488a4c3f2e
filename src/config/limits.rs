//! Channel limits configuration.

use serde::Deserialize;

/// Channel limits configuration.
///
/// These bound per-channel resources (ban lists, names, keys) and the size
/// of each broadcast mode batch.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelLimitsConfig {
    /// Combined cap on ban + exception + invite-exception entries (default: 25).
    /// Servers are exempt.
    #[serde(default = "default_max_bans")]
    pub max_bans: usize,
    /// Parameters per broadcast mode batch (default: 4).
    #[serde(default = "default_max_mode_params")]
    pub max_mode_params: usize,
    /// Channels a single client may be on (default: 15).
    #[serde(default = "default_max_channels")]
    pub max_channels: usize,
    /// Maximum channel name length (default: 200).
    #[serde(default = "default_channel_len")]
    pub channel_len: usize,
    /// Maximum key length (default: 23).
    #[serde(default = "default_key_len")]
    pub key_len: usize,
    /// Maximum topic length (default: 120).
    #[serde(default = "default_topic_len")]
    pub topic_len: usize,
    /// Mode letters applied to a newly created channel (default: "nt").
    #[serde(default = "default_modes")]
    pub default_modes: String,
    /// Seconds an empty channel survives before it can be destroyed (default: 1800).
    #[serde(default = "default_empty_grace")]
    pub empty_grace_secs: i64,
}

impl Default for ChannelLimitsConfig {
    fn default() -> Self {
        Self {
            max_bans: default_max_bans(),
            max_mode_params: default_max_mode_params(),
            max_channels: default_max_channels(),
            channel_len: default_channel_len(),
            key_len: default_key_len(),
            topic_len: default_topic_len(),
            default_modes: default_modes(),
            empty_grace_secs: default_empty_grace(),
        }
    }
}

fn default_max_bans() -> usize {
    25
}

fn default_max_mode_params() -> usize {
    4
}

fn default_max_channels() -> usize {
    15
}

fn default_channel_len() -> usize {
    200
}

fn default_key_len() -> usize {
    23
}

fn default_topic_len() -> usize {
    120
}

fn default_modes() -> String {
    "nt".to_string()
}

fn default_empty_grace() -> i64 {
    30 * 60
}
