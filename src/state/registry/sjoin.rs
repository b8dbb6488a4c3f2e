//! SJOIN from peers and burst generation towards them.

use super::{ChannelRegistry, Effects};
use crate::state::channel::Channel;
use crate::state::channel::sjoin::{
    SjoinAnnouncement, SjoinOutcome, SjoinRequest, announce, apply_sjoin,
};
use crate::state::observer::ChannelEvent;
use crate::telemetry::spans;
use crate::util::{irc_to_lower, is_valid_channel};
use tracing::{debug, warn};

impl ChannelRegistry {
    /// Merge a peer's view of a channel.
    ///
    /// Returns `None` when the announcement is dropped: local-only `&`
    /// channels and malformed names never cross links, and peers get no
    /// error back.
    pub fn sjoin(&self, req: &SjoinRequest) -> Option<SjoinOutcome> {
        if req.channel.starts_with('&') {
            debug!(channel = %req.channel, link = %req.link, "SJOIN for local channel dropped");
            return None;
        }
        if !is_valid_channel(&req.channel, self.config.channels.channel_len) {
            warn!(channel = %req.channel, link = %req.link, "SJOIN with bad channel name dropped");
            return None;
        }

        let _span = spans::sjoin(&req.channel, &req.link, req.ts).entered();
        let folded = irc_to_lower(&req.channel);
        let now = self.now();

        let mut effects = Effects::default();
        let outcome = self.with_live_or_create(
            &folded,
            || Channel::new(&req.channel, 0, now),
            |chan, created| {
                let env = self.mode_env(now);
                let outcome = apply_sjoin(chan, req, &env, created);

                for (uid, tier) in &outcome.joined {
                    self.link_member(&folded, chan, uid, *tier, &mut effects);
                }
                self.push_diffs(chan, outcome.diffs.clone(), &mut effects);
                if let Some(winner) = outcome.winner {
                    effects.events.push(ChannelEvent::SjoinConflictResolved {
                        channel: chan.name.clone(),
                        winner,
                        deposed: outcome.deposed.clone(),
                    });
                }

                if created && chan.is_empty() {
                    chan.tombstone = true;
                    self.channels.remove(&folded);
                    effects.events.clear();
                }
                outcome
            },
        );
        self.complete(effects);
        Some(outcome)
    }

    /// The SJOIN this server sends for one channel over `to_link`.
    pub fn burst(&self, name: &str, to_link: &str) -> Option<SjoinAnnouncement> {
        if name.starts_with('&') {
            return None;
        }
        self.with_live(&irc_to_lower(name), |chan| announce(chan, &self.clients, to_link))
    }

    /// Bursts for every shareable channel, in name order.
    pub fn burst_all(&self, to_link: &str) -> Vec<SjoinAnnouncement> {
        self.channel_names()
            .into_iter()
            .filter(|folded| !folded.starts_with('&'))
            .filter_map(|folded| {
                self.with_live(&folded, |chan| {
                    (!chan.is_empty()).then(|| announce(chan, &self.clients, to_link))
                })
                .flatten()
            })
            .collect()
    }
}
