//! Membership roster partitioned by privilege tier.
//!
//! A member sits in exactly one of four tier lists. Moving between tiers is a
//! single operation, so the partition can't be broken by a half-applied
//! update, and `op_count` is adjusted in the same place the chanop list is.

use crate::state::Uid;
use std::collections::HashMap;

/// Per-channel privilege tier, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Peon,
    Voiced,
    HalfOp,
    ChanOp,
}

impl Tier {
    /// All tiers, highest first.
    pub const DESCENDING: [Tier; 4] = [Tier::ChanOp, Tier::HalfOp, Tier::Voiced, Tier::Peon];

    /// The channel mode letter that grants this tier.
    pub fn mode_letter(self) -> Option<char> {
        match self {
            Tier::ChanOp => Some('o'),
            Tier::HalfOp => Some('h'),
            Tier::Voiced => Some('v'),
            Tier::Peon => None,
        }
    }

    /// NAMES/SJOIN prefix character.
    pub fn prefix(self) -> Option<char> {
        match self {
            Tier::ChanOp => Some('@'),
            Tier::HalfOp => Some('%'),
            Tier::Voiced => Some('+'),
            Tier::Peon => None,
        }
    }

    /// Highest tier named by a prefix string such as `@+`.
    pub fn from_prefixes(prefixes: &str) -> Tier {
        prefixes
            .chars()
            .filter_map(|c| match c {
                '@' => Some(Tier::ChanOp),
                '%' => Some(Tier::HalfOp),
                '+' => Some(Tier::Voiced),
                _ => None,
            })
            .max()
            .unwrap_or(Tier::Peon)
    }

    /// Chanop or half-op.
    pub fn is_privileged(self) -> bool {
        self >= Tier::HalfOp
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// The member set of one channel.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    tiers: [Vec<Uid>; 4],
    index: HashMap<Uid, Tier>,
    op_count: usize,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a member. Returns false if the client is already on the roster.
    pub fn add(&mut self, uid: &str, tier: Tier) -> bool {
        if self.index.contains_key(uid) {
            return false;
        }
        self.tiers[tier.slot()].push(uid.to_string());
        self.index.insert(uid.to_string(), tier);
        if tier == Tier::ChanOp {
            self.op_count += 1;
        }
        true
    }

    /// Remove a member from whichever tier holds it.
    pub fn remove(&mut self, uid: &str) -> Option<Tier> {
        let tier = self.index.remove(uid)?;
        self.tiers[tier.slot()].retain(|m| m != uid);
        if tier == Tier::ChanOp {
            self.op_count -= 1;
        }
        Some(tier)
    }

    /// Move a member to `new_tier`. Returns the previous tier, or `None` if
    /// the client is not a member. Moving to the current tier keeps the
    /// member's position in its list.
    pub fn change_tier(&mut self, uid: &str, new_tier: Tier) -> Option<Tier> {
        let old = *self.index.get(uid)?;
        if old == new_tier {
            return Some(old);
        }
        self.tiers[old.slot()].retain(|m| m != uid);
        self.tiers[new_tier.slot()].push(uid.to_string());
        self.index.insert(uid.to_string(), new_tier);
        match (old == Tier::ChanOp, new_tier == Tier::ChanOp) {
            (true, false) => self.op_count -= 1,
            (false, true) => self.op_count += 1,
            _ => {}
        }
        Some(old)
    }

    pub fn is_member(&self, uid: &str) -> bool {
        self.index.contains_key(uid)
    }

    pub fn tier_of(&self, uid: &str) -> Option<Tier> {
        self.index.get(uid).copied()
    }

    /// Members of one tier in insertion order.
    pub fn members_of(&self, tier: Tier) -> &[Uid] {
        &self.tiers[tier.slot()]
    }

    /// Every member with its tier, highest tier first.
    pub fn iter(&self) -> impl Iterator<Item = (&Uid, Tier)> {
        Tier::DESCENDING
            .into_iter()
            .flat_map(move |t| self.tiers[t.slot()].iter().map(move |uid| (uid, t)))
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn op_count(&self) -> usize {
        self.op_count
    }

    /// Check that the tier lists partition the member set and that the
    /// op count mirrors the chanop list.
    pub fn is_consistent(&self) -> bool {
        let listed: usize = self.tiers.iter().map(Vec::len).sum();
        listed == self.index.len()
            && self.op_count == self.tiers[Tier::ChanOp.slot()].len()
            && Tier::DESCENDING.into_iter().all(|t| {
                self.tiers[t.slot()]
                    .iter()
                    .all(|uid| self.index.get(uid) == Some(&t))
            })
    }
}
