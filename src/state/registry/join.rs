//! JOIN and INVITE.

use super::{ChannelRegistry, Effects};
use crate::error::{ChannelError, ChannelResult};
use crate::state::Uid;
use crate::state::channel::{Channel, ModeFlags, Tier, Topic};
use crate::state::client::{Client, Memberships};
use crate::state::observer::ChannelEvent;
use crate::telemetry::spans;
use crate::util::{irc_to_lower, is_valid_channel};
use tracing::debug;

/// Result of a successful join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// Display name of the channel joined (a sub-channel for vchan joins).
    pub channel: String,
    pub tier: Tier,
    pub created: bool,
    pub topic: Option<Topic>,
}

impl ChannelRegistry {
    /// Join `uid` to `name`, creating the channel if needed.
    ///
    /// Gates are checked in order: ban (unless excepted), invite-only
    /// (unless invited or invex-matched), key, limit. The first member of an
    /// empty channel becomes chanop and re-stamps the channel timestamp.
    pub fn join(&self, name: &str, uid: &str, key: Option<&str>) -> ChannelResult<JoinOutcome> {
        let client = self.client(uid)?;
        if !is_valid_channel(name, self.config.channels.channel_len) {
            return Err(ChannelError::BadChannelName(name.to_string()));
        }
        self.join_folded(&irc_to_lower(name), name, &client, key)
    }

    pub(super) fn join_folded(
        &self,
        folded: &str,
        display: &str,
        client: &Client,
        key: Option<&str>,
    ) -> ChannelResult<JoinOutcome> {
        let _span = spans::channel(display, &client.nick).entered();

        let links = self.clients.memberships(&client.uid).unwrap_or_default();
        if links.channels.contains(folded) {
            return Err(ChannelError::AlreadyMember);
        }
        if client.is_local() && links.channels.len() >= self.config.channels.max_channels {
            return Err(ChannelError::TooManyChannels);
        }

        let now = self.now();
        let mut effects = Effects::default();
        let result = self.with_live_or_create(
            folded,
            || Channel::new(display, now, now),
            |chan, created| self.admit(folded, chan, client, key, created, &links, now, &mut effects),
        );
        self.complete(effects);
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn admit(
        &self,
        folded: &str,
        chan: &mut Channel,
        client: &Client,
        key: Option<&str>,
        created: bool,
        links: &Memberships,
        now: i64,
        effects: &mut Effects,
    ) -> ChannelResult<JoinOutcome> {
        if chan.is_member(&client.uid) {
            return Err(ChannelError::AlreadyMember);
        }

        let family = match &chan.vchan.root {
            Some(root) => Some(root.clone()),
            None if chan.is_vchan_top() => Some(folded.to_string()),
            None => None,
        };
        if let Some(family) = family {
            if links.vchans.contains_key(&family) || links.channels.contains(&family) {
                return Err(ChannelError::AlreadyOnSubchan(family));
            }
        }

        if !created {
            check_gates(chan, client, key)?;
        }

        let first = chan.is_empty();
        let tier = if first { Tier::ChanOp } else { Tier::Peon };
        if first {
            chan.ts = now;
        }
        chan.take_invite(&client.uid);
        chan.note_join(now);
        self.attach(folded, chan, client, tier, now, effects);
        if created {
            self.apply_default_modes(chan, effects);
        }

        debug!(channel = %chan.name, uid = %client.uid, tier = ?tier, created, "joined");
        Ok(JoinOutcome {
            channel: chan.name.clone(),
            tier,
            created,
            topic: chan.topic.clone(),
        })
    }

    /// Invite `target_nick` to `name`. On `+i` channels only chanops and
    /// half-ops may invite. Returns the invitee's UID.
    pub fn invite(&self, name: &str, uid: &str, target_nick: &str) -> ChannelResult<Uid> {
        let inviter = self.client(uid)?;
        let target = self
            .clients
            .find_by_nick(target_nick)
            .ok_or_else(|| ChannelError::NoSuchNick(target_nick.to_string()))?;
        let folded = self.route(&irc_to_lower(name), Some(uid));

        let mut effects = Effects::default();
        let result = self
            .with_live(&folded, |chan| {
                let tier = chan.tier_of(&inviter.uid).ok_or(ChannelError::NotAMember)?;
                if chan.has(ModeFlags::INVITE_ONLY) && !tier.is_privileged() {
                    return Err(ChannelError::InsufficientPrivilege);
                }
                if chan.is_member(&target.uid) {
                    return Err(ChannelError::AlreadyMember);
                }
                chan.add_invite(&target.uid);
                self.clients
                    .with_links(&target.uid, |links| links.invited.insert(folded.clone()));
                effects.events.push(ChannelEvent::Invited {
                    channel: chan.name.clone(),
                    uid: target.uid.clone(),
                    by: inviter.hostmask(),
                });
                Ok(target.uid.clone())
            })
            .unwrap_or_else(|| Err(ChannelError::ChannelNotFound(name.to_string())));
        self.complete(effects);
        result
    }
}

fn check_gates(chan: &Channel, client: &Client, key: Option<&str>) -> ChannelResult<()> {
    if chan.ban_status(client).is_banned() {
        return Err(ChannelError::Banned);
    }
    if chan.has(ModeFlags::INVITE_ONLY) && !chan.is_invited(client) {
        return Err(ChannelError::InviteOnly);
    }
    if let Some(expected) = chan.modes.key() {
        if key != Some(expected) {
            return Err(ChannelError::BadKey);
        }
    }
    if let Some(limit) = chan.modes.limit() {
        if chan.member_count() >= limit as usize {
            return Err(ChannelError::ChannelFull);
        }
    }
    Ok(())
}
