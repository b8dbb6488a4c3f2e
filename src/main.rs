//! slircd-chanstate - channel state daemon.
//!
//! Loads configuration, sets up logging, and runs the periodic reap sweep
//! around an empty channel registry until interrupted.

use slircd_chanstate::config::Config;
use slircd_chanstate::state::{
    ChannelRegistry, ClientTable, SystemClock, TracingObserver, spawn_reaper,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path).map_err(|e| {
            error!(path = %path, error = %e, "Failed to load config");
            e
        })?,
        None => {
            info!("No config file given, using defaults");
            Config::default()
        }
    };

    info!(
        server = %config.server.name,
        sid = %config.server.sid,
        max_bans = config.channels.max_bans,
        vchans = config.vchans.enabled,
        "Starting slircd-chanstate"
    );

    let clients = Arc::new(ClientTable::new(config.server.sid.clone()));
    let reap_every = config.reaper.interval();
    let registry = Arc::new(ChannelRegistry::new(
        config,
        clients,
        Arc::new(SystemClock),
        Arc::new(TracingObserver),
    ));

    let reaper = spawn_reaper(Arc::clone(&registry), reap_every);
    info!(interval = ?reap_every, "Reaper started");

    tokio::signal::ctrl_c().await?;
    info!(channels = registry.len(), "Shutting down");
    reaper.abort();
    Ok(())
}
