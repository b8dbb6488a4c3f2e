//! The channel registry.
//!
//! Process-wide map from case-folded channel name to channel. Each channel
//! sits behind its own mutex, so operations on different channels run in
//! parallel while the mode and SJOIN engines never interleave on one.
//!
//! # Locking
//!
//! - The map guard is dropped before a channel lock is taken.
//! - At most one channel lock is held at a time. Multi-channel operations
//!   visit channels one by one in lexical order.
//! - Client entries may be touched while a channel lock is held, never the
//!   other way round.
//! - A destroyed channel is tombstoned before it leaves the map; anyone who
//!   raced to a stale handle sees the tombstone and looks the name up again.

mod join;
mod modes;
mod part;
mod reap;
mod sjoin;
mod topic;
mod vchan;

pub use join::JoinOutcome;
pub use reap::spawn_reaper;
pub use vchan::VchanInfo;

use crate::config::Config;
use crate::error::{ChannelError, ChannelResult};
use crate::state::Uid;
use crate::state::channel::mode_change::{ModeEnv, Source};
use crate::state::channel::{
    Actor, Channel, DiffBuilder, DiffGroup, ModeDiff, ModeFlags, Tier, Visibility,
};
use crate::state::clock::Clock;
use crate::state::client::{Client, ClientTable};
use crate::state::observer::{ChannelEvent, ChannelObserver, LeaveReason};
use crate::util::irc_to_lower;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

/// Events and follow-up work produced under a channel lock.
#[derive(Debug, Default)]
pub(crate) struct Effects {
    events: Vec<ChannelEvent>,
    /// `(root, sub)` pairs whose sub-channel was destroyed.
    orphaned: Vec<(String, String)>,
}

/// All channels known to this server.
pub struct ChannelRegistry {
    config: Config,
    clients: Arc<ClientTable>,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn ChannelObserver>,
    channels: DashMap<String, Arc<Mutex<Channel>>>,
}

impl ChannelRegistry {
    pub fn new(
        config: Config,
        clients: Arc<ClientTable>,
        clock: Arc<dyn Clock>,
        observer: Arc<dyn ChannelObserver>,
    ) -> Self {
        Self {
            config,
            clients,
            clock,
            observer,
            channels: DashMap::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clients(&self) -> &Arc<ClientTable> {
        &self.clients
    }

    /// Number of live channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.channels.contains_key(&irc_to_lower(name))
    }

    /// Folded names of every channel, sorted.
    pub fn channel_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Read a channel under its lock.
    pub fn inspect<R>(&self, name: &str, f: impl FnOnce(&Channel) -> R) -> Option<R> {
        self.with_live(&irc_to_lower(name), |chan| f(chan))
    }

    /// Members of a channel with their tiers, highest tier first.
    pub fn members(&self, name: &str) -> ChannelResult<Vec<(Uid, Tier)>> {
        self.inspect(name, |chan| {
            chan.roster
                .iter()
                .map(|(uid, tier)| (uid.clone(), tier))
                .collect::<Vec<_>>()
        })
        .ok_or_else(|| ChannelError::ChannelNotFound(name.to_string()))
    }

    /// A member's tier, or `None` if the channel or membership is missing.
    pub fn tier_of(&self, name: &str, uid: &str) -> Option<Tier> {
        self.inspect(name, |chan| chan.tier_of(uid)).flatten()
    }

    fn now(&self) -> i64 {
        self.clock.now()
    }

    fn lookup(&self, key: &str) -> Option<Arc<Mutex<Channel>>> {
        self.channels.get(key).map(|e| Arc::clone(e.value()))
    }

    /// Run `f` on the live channel stored under `key`.
    pub(crate) fn with_live<R>(&self, key: &str, f: impl FnOnce(&mut Channel) -> R) -> Option<R> {
        loop {
            let handle = self.lookup(key)?;
            let mut chan = handle.lock();
            if chan.tombstone {
                continue;
            }
            return Some(f(&mut chan));
        }
    }

    /// Run `f` on the channel under `key`, creating it with `make` if absent.
    /// The flag passed to `f` is true when this call created the channel.
    pub(crate) fn with_live_or_create<R>(
        &self,
        key: &str,
        make: impl Fn() -> Channel,
        f: impl FnOnce(&mut Channel, bool) -> R,
    ) -> R {
        loop {
            let (handle, created) = match self.channels.entry(key.to_string()) {
                Entry::Occupied(e) => (Arc::clone(e.get()), false),
                Entry::Vacant(e) => {
                    let handle = Arc::new(Mutex::new(make()));
                    e.insert(Arc::clone(&handle));
                    (handle, true)
                }
            };
            let mut chan = handle.lock();
            if chan.tombstone {
                continue;
            }
            return f(&mut chan, created);
        }
    }

    fn resolve_source(&self, actor: &Actor) -> ChannelResult<Source> {
        match actor {
            Actor::Server(name) => Ok(Source::Server(name.clone())),
            Actor::Client(uid) => self
                .clients
                .get(uid)
                .map(Source::from_client)
                .ok_or(ChannelError::SessionInvalid),
        }
    }

    fn client(&self, uid: &str) -> ChannelResult<Client> {
        self.clients.get(uid).ok_or(ChannelError::SessionInvalid)
    }

    fn mode_env(&self, now: i64) -> ModeEnv<'_> {
        ModeEnv {
            clients: &self.clients,
            limits: &self.config.channels,
            server_name: &self.config.server.name,
            now,
        }
    }

    /// The channel a client means by `key`: the key itself if the client is
    /// on it, else the sub-channel the vchan overlay routes it to.
    fn route(&self, key: &str, uid: Option<&str>) -> String {
        let Some(links) = uid.and_then(|u| self.clients.memberships(u)) else {
            return key.to_string();
        };
        if links.channels.contains(key) {
            return key.to_string();
        }
        links
            .vchans
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    fn grace_for(&self, chan: &Channel) -> i64 {
        if chan.is_sub_channel() {
            self.config.vchans.grace_secs
        } else {
            self.config.channels.empty_grace_secs
        }
    }

    /// Default modes applied to a channel created by a local join.
    fn apply_default_modes(&self, chan: &mut Channel, effects: &mut Effects) {
        let flags = ModeFlags::from_simple_letters(&self.config.channels.default_modes);
        let before = chan.modes.clone();
        if !chan.modes.set_flags(flags, true) {
            return;
        }
        let mut diffs = DiffBuilder::new(self.config.channels.max_mode_params);
        for step in before.diff(&chan.modes) {
            diffs.push(
                DiffGroup::Standard,
                Visibility::AllMembers,
                &self.config.server.name,
                step,
            );
        }
        self.push_diffs(chan, diffs.finish(), effects);
    }

    fn push_diffs(&self, chan: &Channel, diffs: Vec<ModeDiff>, effects: &mut Effects) {
        for diff in diffs {
            effects.events.push(ChannelEvent::ModeChanged {
                channel: chan.name.clone(),
                diff,
            });
        }
    }

    /// Add a member and its back-references.
    fn attach(&self, key: &str, chan: &mut Channel, client: &Client, tier: Tier, now: i64, effects: &mut Effects) {
        if chan.add_member(&client.uid, tier, client.is_local(), now) {
            self.link_member(key, chan, &client.uid, tier, effects);
        }
    }

    /// Back-references and the join event for a member already in the roster.
    fn link_member(&self, key: &str, chan: &Channel, uid: &Uid, tier: Tier, effects: &mut Effects) {
        let root = chan.vchan.root.clone();
        self.clients.with_links(uid, |links| {
            links.channels.insert(key.to_string());
            links.invited.remove(key);
            if let Some(root) = root {
                links.vchans.insert(root, key.to_string());
            }
        });
        effects.events.push(ChannelEvent::MemberJoined {
            channel: chan.name.clone(),
            uid: uid.clone(),
            tier,
        });
    }

    /// Remove a member, its back-references, and the channel if it is now
    /// empty and old enough.
    fn detach(
        &self,
        key: &str,
        chan: &mut Channel,
        client: &Client,
        reason: LeaveReason,
        now: i64,
        effects: &mut Effects,
    ) -> ChannelResult<()> {
        chan.remove_member(&client.uid, &client.nick, client.is_local(), now)
            .ok_or(ChannelError::NotAMember)?;

        let root = chan.vchan.root.clone();
        self.clients.with_links(&client.uid, |links| {
            links.channels.remove(key);
            if let Some(root) = root {
                if links.vchans.get(&root).is_some_and(|sub| sub == key) {
                    links.vchans.remove(&root);
                }
            }
        });
        effects.events.push(ChannelEvent::MemberLeft {
            channel: chan.name.clone(),
            uid: client.uid.clone(),
            reason,
        });

        self.destroy_if_stale(key, chan, now, effects);
        Ok(())
    }

    /// Destroy an empty channel at once if it was created longer ago than
    /// its grace period. Younger channels are left for the reaper.
    fn destroy_if_stale(&self, key: &str, chan: &mut Channel, now: i64, effects: &mut Effects) {
        let grace = self.grace_for(chan);
        if chan.is_empty() && !chan.is_vchan_top() && chan.created_at + grace <= now {
            self.destroy_locked(key, chan, effects);
        }
    }

    /// Tombstone a channel and drop it from the map. Caller holds its lock.
    fn destroy_locked(&self, key: &str, chan: &mut Channel, effects: &mut Effects) {
        chan.tombstone = true;
        self.channels.remove(key);
        for uid in chan.invites.drain(..) {
            self.clients.with_links(&uid, |links| links.invited.remove(key));
        }
        if let Some(root) = chan.vchan.root.clone() {
            effects.orphaned.push((root, key.to_string()));
        }
        info!(channel = %chan.name, ts = chan.ts, "channel destroyed");
        effects.events.push(ChannelEvent::ChannelDestroyed {
            channel: chan.name.clone(),
        });
    }

    /// Deliver events and finish teardown once no channel lock is held.
    fn complete(&self, effects: Effects) {
        for event in &effects.events {
            self.observer.on_event(event);
        }
        for (root, sub) in effects.orphaned {
            self.unlink_sub(&root, &sub);
        }
    }
}
