//! Periodic sweep of empty channels.

use super::{ChannelRegistry, Effects};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

impl ChannelRegistry {
    /// Destroy every empty channel whose grace period has run out.
    /// Returns how many were destroyed.
    pub fn reap(&self) -> usize {
        let now = self.now();
        let mut destroyed = 0;

        for folded in self.channel_names() {
            let mut effects = Effects::default();
            let reaped = self.with_live(&folded, |chan| {
                let grace = self.grace_for(chan);
                if chan.is_reapable(grace, now) {
                    self.destroy_locked(&folded, chan, &mut effects);
                    true
                } else {
                    false
                }
            });
            self.complete(effects);
            if reaped == Some(true) {
                destroyed += 1;
            }
        }

        if destroyed > 0 {
            info!(destroyed, remaining = self.len(), "reaped empty channels");
        }
        destroyed
    }
}

/// Run [`ChannelRegistry::reap`] every `period` on the tokio runtime.
pub fn spawn_reaper(registry: Arc<ChannelRegistry>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            let destroyed = registry.reap();
            debug!(destroyed, "reap sweep");
        }
    })
}
