//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, ServerConfig, ReaperConfig)
//! - [`limits`]: Channel limits (ban list cap, batch size, name/key/topic lengths)
//! - [`vchans`]: Virtual channel overlay configuration

mod limits;
mod types;
mod vchans;

pub use limits::ChannelLimitsConfig;
pub use types::{Config, ConfigError, ReaperConfig, ServerConfig};
pub use vchans::VchanConfig;
