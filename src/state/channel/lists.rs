//! Ban, exception and invite-exception lists.
//!
//! All three lists are ordered by insertion and share one combined cap.
//! Matching is first-hit: the first ban that matches decides "banned",
//! then the whole exception list is scanned, since the excepting mask need
//! not sit anywhere near the ban that fired.

use crate::error::ChannelError;
use crate::util::{irc_eq, matches_hostmask};

/// Which list a mask belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    Ban,
    Exception,
    InviteException,
}

impl ListKind {
    pub fn mode_letter(self) -> char {
        match self {
            ListKind::Ban => 'b',
            ListKind::Exception => 'e',
            ListKind::InviteException => 'I',
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        match c {
            'b' => Some(ListKind::Ban),
            'e' => Some(ListKind::Exception),
            'I' => Some(ListKind::InviteException),
            _ => None,
        }
    }
}

/// An entry in a list (bans, excepts, invex).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub mask: String,
    pub set_by: String,
    pub set_at: i64,
}

/// Outcome of a ban check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanStatus {
    NotBanned,
    Banned,
    /// A ban matched, but so did an exception.
    Excepted,
}

impl BanStatus {
    pub fn is_banned(self) -> bool {
        self == BanStatus::Banned
    }
}

/// The three pattern lists of one channel.
#[derive(Debug, Clone, Default)]
pub struct ListSet {
    bans: Vec<ListEntry>,
    excepts: Vec<ListEntry>,
    invex: Vec<ListEntry>,
    count: usize,
}

impl ListSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self, kind: ListKind) -> &[ListEntry] {
        match kind {
            ListKind::Ban => &self.bans,
            ListKind::Exception => &self.excepts,
            ListKind::InviteException => &self.invex,
        }
    }

    fn entries_mut(&mut self, kind: ListKind) -> &mut Vec<ListEntry> {
        match kind {
            ListKind::Ban => &mut self.bans,
            ListKind::Exception => &mut self.excepts,
            ListKind::InviteException => &mut self.invex,
        }
    }

    /// Combined number of entries across all three lists.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Append a mask.
    ///
    /// `cap` is the combined limit, or `None` for servers and bursts.
    /// A mask already covered by an existing entry is a `Duplicate`.
    pub fn add(
        &mut self,
        kind: ListKind,
        mask: &str,
        set_by: &str,
        set_at: i64,
        cap: Option<usize>,
    ) -> Result<(), ChannelError> {
        if let Some(cap) = cap {
            if self.count >= cap {
                return Err(ChannelError::ListFull(kind.mode_letter()));
            }
        }

        let list = self.entries_mut(kind);
        if list.iter().any(|e| matches_hostmask(&e.mask, mask)) {
            return Err(ChannelError::Duplicate);
        }

        list.push(ListEntry {
            mask: mask.to_string(),
            set_by: set_by.to_string(),
            set_at,
        });
        self.count += 1;
        Ok(())
    }

    /// Remove the first entry whose mask equals `mask` (case-insensitive,
    /// no wildcard expansion).
    pub fn remove(&mut self, kind: ListKind, mask: &str) -> Result<ListEntry, ChannelError> {
        let list = self.entries_mut(kind);
        let pos = list
            .iter()
            .position(|e| irc_eq(&e.mask, mask))
            .ok_or_else(|| ChannelError::NoSuchListEntry(mask.to_string()))?;
        let entry = list.remove(pos);
        self.count = self.count.saturating_sub(1);
        Ok(entry)
    }

    /// Empty one list, returning what was removed.
    pub fn clear(&mut self, kind: ListKind) -> Vec<ListEntry> {
        let removed = std::mem::take(self.entries_mut(kind));
        self.count = self.count.saturating_sub(removed.len());
        removed
    }

    fn any_matches(list: &[ListEntry], hostmask: &str, ipmask: &str) -> bool {
        list.iter()
            .any(|e| matches_hostmask(&e.mask, hostmask) || matches_hostmask(&e.mask, ipmask))
    }

    /// Check a client's host form and IP form against bans and exceptions.
    pub fn check_banned(&self, hostmask: &str, ipmask: &str) -> BanStatus {
        if !Self::any_matches(&self.bans, hostmask, ipmask) {
            return BanStatus::NotBanned;
        }
        if Self::any_matches(&self.excepts, hostmask, ipmask) {
            BanStatus::Excepted
        } else {
            BanStatus::Banned
        }
    }

    /// Whether a client matches an invite-exception.
    pub fn matches_invex(&self, hostmask: &str, ipmask: &str) -> bool {
        Self::any_matches(&self.invex, hostmask, ipmask)
    }
}
