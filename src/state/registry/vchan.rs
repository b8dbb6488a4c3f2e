//! Virtual channels.
//!
//! A root channel can fork sub-channels named `##<root>_<ts>`. Each client
//! is routed to at most one instance of a family; the client-side cache
//! (root -> sub) is kept in step with membership by `attach`/`detach`.

use super::{ChannelRegistry, Effects};
use crate::error::{ChannelError, ChannelResult};
use crate::state::channel::{Channel, Tier};
use crate::util::{irc_to_lower, is_valid_channel};
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

/// One instance of a vchan family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VchanInfo {
    pub name: String,
    /// Display label, see [`ChannelRegistry::pick_representative_id`].
    pub representative: Option<String>,
    pub members: usize,
}

impl ChannelRegistry {
    /// The instance of `root` that `uid` is routed to: the root if the
    /// client is on it, else its cached sub-channel.
    pub fn resolve(&self, root: &str, uid: &str) -> Option<String> {
        let folded = irc_to_lower(root);
        let links = self.clients.memberships(uid)?;
        let target = if links.channels.contains(&folded) {
            folded
        } else {
            links.vchans.get(&folded)?.clone()
        };
        self.with_live(&target, |chan| chan.name.clone())
    }

    /// Fork a new sub-channel of `root` with `uid` as its chanop.
    /// Returns the sub-channel's name.
    pub fn create_sub(&self, root: &str, uid: &str) -> ChannelResult<String> {
        let client = self.client(uid)?;
        let root_key = irc_to_lower(root);
        if !self.config.vchans.enabled {
            return Err(ChannelError::VchanLimit(root.to_string()));
        }

        let links = self.clients.memberships(uid).unwrap_or_default();
        if links.vchans.contains_key(&root_key) || links.channels.contains(&root_key) {
            return Err(ChannelError::AlreadyOnSubchan(root.to_string()));
        }
        if client.is_local() && links.channels.len() >= self.config.channels.max_channels {
            return Err(ChannelError::TooManyChannels);
        }

        let root_name = self
            .with_live(&root_key, |chan| {
                (!chan.is_sub_channel()).then(|| chan.name.clone())
            })
            .ok_or_else(|| ChannelError::ChannelNotFound(root.to_string()))?
            .ok_or_else(|| ChannelError::BadChannelName(root.to_string()))?;

        let now = self.now();
        let (sub_key, sub_name) = self.reserve_sub_name(&root_key, &root_name, now)?;

        let linked = self.with_live(&root_key, |chan| {
            if chan.vchan.subs.len() >= self.config.vchans.max_per_channel {
                return false;
            }
            chan.vchan.subs.push(sub_key.clone());
            true
        });
        if linked != Some(true) {
            if let Some((_, handle)) = self.channels.remove(&sub_key) {
                handle.lock().tombstone = true;
            }
            return Err(match linked {
                None => ChannelError::ChannelNotFound(root.to_string()),
                Some(_) => ChannelError::VchanLimit(root_name),
            });
        }

        let mut effects = Effects::default();
        self.with_live(&sub_key, |chan| {
            chan.note_join(now);
            self.attach(&sub_key, chan, &client, Tier::ChanOp, now, &mut effects);
            self.apply_default_modes(chan, &mut effects);
        });
        self.complete(effects);

        info!(root = %root_name, sub = %sub_name, creator = %client.nick, "vchan created");
        Ok(sub_name)
    }

    /// Insert an empty sub-channel under the first free `##<root>_<ts>` name,
    /// trying successive timestamps up to the configured delta.
    fn reserve_sub_name(&self, root_key: &str, root_name: &str, now: i64) -> ChannelResult<(String, String)> {
        let base = root_name.trim_start_matches(['#', '&']);
        for delta in 0..=self.config.vchans.max_ts_delta {
            let ts = now + delta;
            let name = format!("##{}_{}", base, ts);
            if !is_valid_channel(&name, self.config.channels.channel_len) {
                return Err(ChannelError::BadChannelName(name));
            }
            let key = irc_to_lower(&name);
            if let Entry::Vacant(slot) = self.channels.entry(key.clone()) {
                let mut chan = Channel::new(&name, ts, now);
                chan.vchan.root = Some(root_key.to_string());
                slot.insert(Arc::new(Mutex::new(chan)));
                return Ok((key, name));
            }
        }
        warn!(root = %root_name, "no free vchan name");
        Err(ChannelError::VchanLimit(root_name.to_string()))
    }

    /// Every instance of a family, root first.
    pub fn list_vchans(&self, root: &str) -> ChannelResult<Vec<VchanInfo>> {
        let root_key = irc_to_lower(root);
        let (root_info, subs) = self
            .with_live(&root_key, |chan| (self.describe(chan), chan.vchan.subs.clone()))
            .ok_or_else(|| ChannelError::ChannelNotFound(root.to_string()))?;

        let mut out = vec![root_info];
        for sub in subs {
            if let Some(info) = self.with_live(&sub, |chan| self.describe(chan)) {
                out.push(info);
            }
        }
        Ok(out)
    }

    fn describe(&self, chan: &Channel) -> VchanInfo {
        VchanInfo {
            name: chan.name.clone(),
            representative: self.representative(chan),
            members: chan.member_count(),
        }
    }

    fn representative(&self, chan: &Channel) -> Option<String> {
        chan.first_member()
            .and_then(|uid| self.clients.nick_of(uid))
            .or_else(|| chan.vchan_id.clone())
    }

    /// Display label for a channel instance: the first member found in
    /// chanop, half-op, voice, peon order, else the nick of the last member
    /// to leave.
    pub fn pick_representative_id(&self, name: &str) -> ChannelResult<Option<String>> {
        self.with_live(&irc_to_lower(name), |chan| self.representative(chan))
            .ok_or_else(|| ChannelError::ChannelNotFound(name.to_string()))
    }

    /// Join the instance of `root` that `member_nick` is on.
    pub fn join_vchan(
        &self,
        root: &str,
        uid: &str,
        member_nick: &str,
        key: Option<&str>,
    ) -> ChannelResult<super::JoinOutcome> {
        let client = self.client(uid)?;
        let member = self
            .clients
            .find_by_nick(member_nick)
            .ok_or_else(|| ChannelError::NoSuchNick(member_nick.to_string()))?;
        let root_key = irc_to_lower(root);
        let links = self.clients.memberships(&member.uid).unwrap_or_default();

        let target = if links.channels.contains(&root_key) {
            root_key
        } else {
            links
                .vchans
                .get(&root_key)
                .cloned()
                .ok_or_else(|| ChannelError::UserNotInChannel(member.nick.clone()))?
        };
        let display = self
            .with_live(&target, |chan| chan.name.clone())
            .ok_or_else(|| ChannelError::ChannelNotFound(root.to_string()))?;
        self.join_folded(&target, &display, &client, key)
    }

    /// Drop a destroyed sub-channel from its root.
    pub(super) fn unlink_sub(&self, root: &str, sub: &str) {
        let now = self.now();
        let mut effects = Effects::default();
        self.with_live(root, |chan| {
            chan.vchan.subs.retain(|s| s != sub);
            self.destroy_if_stale(root, chan, now, &mut effects);
        });
        self.complete(effects);
    }
}
