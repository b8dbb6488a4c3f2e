//! Per-channel state.
//!
//! A [`Channel`] owns its roster, pattern lists, mode state, topic and the
//! vchan family links. It is always accessed under its own mutex held by the
//! registry; nothing in here locks.

pub mod diff;
pub mod lists;
pub mod mode_change;
pub mod modes;
pub mod roster;
pub mod sjoin;

pub use diff::{DiffBuilder, DiffGroup, LinkCapability, ModeDiff, Visibility};
pub use lists::{BanStatus, ListEntry, ListKind, ListSet};
pub use mode_change::{ListReply, ModeChangeOutcome, ModeEnv, Source};
pub use modes::{ModeFlags, ModeState, ModeStep, RenderedModes};
pub use roster::{Roster, Tier};
pub use sjoin::{SjoinAnnouncement, SjoinOutcome, SjoinRequest, SjoinWinner};

use crate::state::Uid;
use crate::state::client::Client;

/// Who is performing an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// A server, by name.
    Server(String),
    /// A client, by UID. May be local or remote.
    Client(Uid),
}

/// Channel topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub text: String,
    pub set_by: String,
    pub set_at: i64,
}

/// Counters consumed by the anti-flood layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FloodCounters {
    pub joins: u32,
    pub last_join: i64,
    pub messages: u32,
    pub last_message: i64,
}

/// Position of a channel in a vchan family.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VchanLink {
    /// Folded name of the root, set on sub-channels.
    pub root: Option<String>,
    /// Folded names of sub-channels, set on the root.
    pub subs: Vec<String>,
}

/// One channel.
#[derive(Debug)]
pub struct Channel {
    pub name: String,
    /// Creation timestamp; the reconciliation authority.
    pub ts: i64,
    /// When this server created its copy. Drives the empty-channel grace.
    pub created_at: i64,
    pub topic: Option<Topic>,
    pub modes: ModeState,
    pub roster: Roster,
    pub lists: ListSet,
    /// Clients holding a pending invite.
    pub invites: Vec<Uid>,
    pub flood: FloodCounters,
    /// Last time the member set changed.
    pub users_last: i64,
    pub local_users: usize,
    pub vchan: VchanLink,
    /// Nick of the last member to leave, while the channel is empty.
    pub vchan_id: Option<String>,
    pub(crate) tombstone: bool,
}

impl Channel {
    pub fn new(name: &str, ts: i64, now: i64) -> Self {
        Self {
            name: name.to_string(),
            ts,
            created_at: now,
            topic: None,
            modes: ModeState::new(),
            roster: Roster::new(),
            lists: ListSet::new(),
            invites: Vec::new(),
            flood: FloodCounters::default(),
            users_last: now,
            local_users: 0,
            vchan: VchanLink::default(),
            vchan_id: None,
            tombstone: false,
        }
    }

    /// Insert a member. Returns false if it is already on the channel.
    pub fn add_member(&mut self, uid: &str, tier: Tier, local: bool, now: i64) -> bool {
        if !self.roster.add(uid, tier) {
            return false;
        }
        if local {
            self.local_users += 1;
        }
        self.users_last = now;
        self.vchan_id = None;
        true
    }

    /// Remove a member. `nick` is remembered as the vchan marker when the
    /// channel becomes empty.
    pub fn remove_member(&mut self, uid: &str, nick: &str, local: bool, now: i64) -> Option<Tier> {
        let tier = self.roster.remove(uid)?;
        if local {
            self.local_users = self.local_users.saturating_sub(1);
        }
        self.users_last = now;
        self.vchan_id = if self.roster.is_empty() {
            Some(nick.to_string())
        } else {
            None
        };
        Some(tier)
    }

    pub fn is_member(&self, uid: &str) -> bool {
        self.roster.is_member(uid)
    }

    pub fn tier_of(&self, uid: &str) -> Option<Tier> {
        self.roster.tier_of(uid)
    }

    pub fn member_count(&self) -> usize {
        self.roster.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    /// Longest-tenured member of the highest tier present.
    pub fn first_member(&self) -> Option<&Uid> {
        self.roster.iter().next().map(|(uid, _)| uid)
    }

    /// Root of a family that currently has sub-channels.
    pub fn is_vchan_top(&self) -> bool {
        self.vchan.root.is_none() && !self.vchan.subs.is_empty()
    }

    pub fn is_sub_channel(&self) -> bool {
        self.vchan.root.is_some()
    }

    /// Local-only `&` channel.
    pub fn is_local_only(&self) -> bool {
        self.name.starts_with('&')
    }

    pub fn has(&self, flag: ModeFlags) -> bool {
        self.modes.has(flag)
    }

    pub fn ban_status(&self, client: &Client) -> BanStatus {
        self.lists.check_banned(&client.hostmask(), &client.ipmask())
    }

    /// Explicit invite or a matching invite-exception.
    pub fn is_invited(&self, client: &Client) -> bool {
        self.invites.iter().any(|u| *u == client.uid)
            || self.lists.matches_invex(&client.hostmask(), &client.ipmask())
    }

    pub fn add_invite(&mut self, uid: &str) {
        if !self.invites.iter().any(|u| u == uid) {
            self.invites.push(uid.to_string());
        }
    }

    /// Drop a pending invite. Returns true if one was held.
    pub fn take_invite(&mut self, uid: &str) -> bool {
        let before = self.invites.len();
        self.invites.retain(|u| u != uid);
        before != self.invites.len()
    }

    pub fn note_join(&mut self, now: i64) {
        self.flood.joins = self.flood.joins.saturating_add(1);
        self.flood.last_join = now;
    }

    pub fn note_message(&mut self, now: i64) {
        self.flood.messages = self.flood.messages.saturating_add(1);
        self.flood.last_message = now;
    }

    /// Whether an empty channel may be destroyed at `now`.
    ///
    /// A vchan top is kept while it has sub-channels.
    pub fn is_reapable(&self, grace_secs: i64, now: i64) -> bool {
        self.is_empty() && !self.is_vchan_top() && self.users_last + grace_secs <= now
    }

    pub fn is_destroyed(&self) -> bool {
        self.tombstone
    }
}
