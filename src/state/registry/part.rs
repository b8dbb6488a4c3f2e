//! PART, KICK, leave-all and QUIT.

use super::{ChannelRegistry, Effects};
use crate::error::{ChannelError, ChannelResult};
use crate::state::channel::mode_change::Source;
use crate::state::channel::{Actor, Tier};
use crate::state::client::Client;
use crate::state::observer::LeaveReason;
use crate::util::irc_to_lower;
use std::collections::BTreeSet;
use tracing::debug;

impl ChannelRegistry {
    /// Leave a channel. A root name parts the sub-channel the client is on.
    pub fn part(&self, name: &str, uid: &str, reason: Option<&str>) -> ChannelResult<()> {
        let client = self.client(uid)?;
        let folded = self.route(&irc_to_lower(name), Some(uid));
        let now = self.now();

        let mut effects = Effects::default();
        let result = self
            .with_live(&folded, |chan| {
                self.detach(
                    &folded,
                    chan,
                    &client,
                    LeaveReason::Part(reason.map(str::to_string)),
                    now,
                    &mut effects,
                )
            })
            .unwrap_or_else(|| Err(ChannelError::ChannelNotFound(name.to_string())));
        self.complete(effects);
        result
    }

    /// Remove `target_nick` from a channel.
    ///
    /// Clients need half-op or better; half-ops cannot kick chanops.
    /// Servers, and remote clients on an untimestamped channel, always may.
    pub fn kick(
        &self,
        name: &str,
        actor: &Actor,
        target_nick: &str,
        reason: Option<&str>,
    ) -> ChannelResult<()> {
        let source = self.resolve_source(actor)?;
        let target = self
            .clients
            .find_by_nick(target_nick)
            .ok_or_else(|| ChannelError::NoSuchNick(target_nick.to_string()))?;
        let folded = self.route(&irc_to_lower(name), source.uid());
        let now = self.now();

        let mut effects = Effects::default();
        let result = self
            .with_live(&folded, |chan| {
                let unlimited = match &source {
                    Source::Server(_) => true,
                    Source::Remote(_) => chan.ts == 0,
                    Source::Local(_) => false,
                };
                if !unlimited {
                    let uid = source.uid().unwrap_or_default();
                    let tier = chan.tier_of(uid).ok_or(ChannelError::NotAMember)?;
                    if !tier.is_privileged() {
                        return Err(ChannelError::InsufficientPrivilege);
                    }
                    if tier == Tier::HalfOp && chan.tier_of(&target.uid) == Some(Tier::ChanOp) {
                        return Err(ChannelError::InsufficientPrivilege);
                    }
                }
                if !chan.is_member(&target.uid) {
                    return Err(ChannelError::UserNotInChannel(target.nick.clone()));
                }
                let reason = LeaveReason::Kick {
                    by: source.identity(),
                    reason: reason.map(str::to_string),
                };
                self.detach(&folded, chan, &target, reason, now, &mut effects)
            })
            .unwrap_or_else(|| Err(ChannelError::ChannelNotFound(name.to_string())));
        self.complete(effects);
        result
    }

    /// Leave every channel (`JOIN 0`). Returns how many were left.
    pub fn part_all(&self, uid: &str) -> ChannelResult<usize> {
        let client = self.client(uid)?;
        Ok(self.leave_everything(&client, |_| LeaveReason::Part(None)))
    }

    /// Remove a disconnecting client from every channel, drop its pending
    /// invites, and forget it.
    pub fn quit(&self, uid: &str, reason: Option<&str>) -> ChannelResult<usize> {
        let client = self.client(uid)?;
        let left = self.leave_everything(&client, |_| LeaveReason::Quit(reason.map(str::to_string)));

        let invited: BTreeSet<String> = self
            .clients
            .memberships(uid)
            .map(|links| links.invited.into_iter().collect())
            .unwrap_or_default();
        for folded in invited {
            self.with_live(&folded, |chan| chan.take_invite(uid));
        }

        self.clients.remove(uid);
        debug!(uid = %uid, channels = left, "client quit");
        Ok(left)
    }

    /// Visit the client's channels one at a time, in lexical order.
    fn leave_everything(&self, client: &Client, reason: impl Fn(&str) -> LeaveReason) -> usize {
        let channels: BTreeSet<String> = self
            .clients
            .memberships(&client.uid)
            .map(|links| links.channels.into_iter().collect())
            .unwrap_or_default();
        let now = self.now();

        let mut left = 0;
        for folded in channels {
            let mut effects = Effects::default();
            let done = self.with_live(&folded, |chan| {
                self.detach(&folded, chan, client, reason(&folded), now, &mut effects)
            });
            self.complete(effects);
            if matches!(done, Some(Ok(()))) {
                left += 1;
            }
        }
        left
    }
}
