//! Client directory.
//!
//! Registration, authentication and nick management live outside the channel
//! engine. The engine only needs to resolve a nick or UID to an identity
//! (`nick!user@host`, raw IP, which link the client arrived on) and to keep
//! each client's non-owning back-references in step with channel membership.
//!
//! # Back-references
//!
//! ```text
//! Channel (owns) ──► Roster entry (uid, tier)
//!    ▲                        │
//!    └──── Memberships.channels (folded names) ◄── Client
//! ```
//!
//! The channel owns membership; the client side is only a set of names,
//! updated in lockstep by the registry.

use super::uid::{Uid, UidGenerator};
use crate::util::irc_to_lower;
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};

/// Where a client is connected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Directly connected to this server.
    Local,
    /// Introduced by a peer; the link name is the uplink it arrived through.
    Remote(String),
}

/// Identity of a client as seen by the channel engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub uid: Uid,
    pub nick: String,
    pub user: String,
    pub host: String,
    pub ip: String,
    pub origin: Origin,
}

impl Client {
    /// `nick!user@host` using the resolved hostname.
    pub fn hostmask(&self) -> String {
        format!("{}!{}@{}", self.nick, self.user, self.host)
    }

    /// `nick!user@ip` using the raw address.
    pub fn ipmask(&self) -> String {
        format!("{}!{}@{}", self.nick, self.user, self.ip)
    }

    pub fn is_local(&self) -> bool {
        self.origin == Origin::Local
    }

    /// Whether the client was introduced over `link`.
    pub fn arrived_via(&self, link: &str) -> bool {
        matches!(&self.origin, Origin::Remote(l) if l == link)
    }
}

/// A client's view of the channels it is on.
#[derive(Debug, Clone, Default)]
pub struct Memberships {
    /// Folded names of every channel (root or sub) the client is on.
    pub channels: HashSet<String>,
    /// Vchan overlay cache: folded root name -> folded sub-channel name.
    pub vchans: HashMap<String, String>,
    /// Folded names of channels the client holds a pending invite for.
    pub invited: HashSet<String>,
}

struct Entry {
    client: Client,
    links: Memberships,
}

/// All clients known to this server, local and remote.
pub struct ClientTable {
    clients: DashMap<Uid, Entry>,
    nicks: DashMap<String, Uid>,
    uids: UidGenerator,
}

impl ClientTable {
    /// Create an empty table allocating local UIDs under `sid`.
    pub fn new(sid: impl Into<String>) -> Self {
        Self {
            clients: DashMap::new(),
            nicks: DashMap::new(),
            uids: UidGenerator::new(sid),
        }
    }

    /// Register a directly connected client. Returns its new UID.
    pub fn register_local(&self, nick: &str, user: &str, host: &str, ip: &str) -> Uid {
        let uid = self.uids.next();
        self.insert(Client {
            uid: uid.clone(),
            nick: nick.to_string(),
            user: user.to_string(),
            host: host.to_string(),
            ip: ip.to_string(),
            origin: Origin::Local,
        });
        uid
    }

    /// Register a client introduced by a peer over `link`.
    pub fn register_remote(
        &self,
        uid: &str,
        nick: &str,
        user: &str,
        host: &str,
        ip: &str,
        link: &str,
    ) -> Uid {
        self.insert(Client {
            uid: uid.to_string(),
            nick: nick.to_string(),
            user: user.to_string(),
            host: host.to_string(),
            ip: ip.to_string(),
            origin: Origin::Remote(link.to_string()),
        });
        uid.to_string()
    }

    fn insert(&self, client: Client) {
        self.nicks.insert(irc_to_lower(&client.nick), client.uid.clone());
        self.clients.insert(
            client.uid.clone(),
            Entry {
                client,
                links: Memberships::default(),
            },
        );
    }

    /// Drop a client. The registry removes it from its channels first.
    pub(crate) fn remove(&self, uid: &str) -> Option<Client> {
        let (_, entry) = self.clients.remove(uid)?;
        self.nicks
            .remove_if(&irc_to_lower(&entry.client.nick), |_, v| v == uid);
        Some(entry.client)
    }

    /// Change a client's nick. Returns false if the UID is unknown.
    pub fn rename(&self, uid: &str, new_nick: &str) -> bool {
        let old = match self.clients.get_mut(uid) {
            Some(mut entry) => std::mem::replace(&mut entry.client.nick, new_nick.to_string()),
            None => return false,
        };
        self.nicks.remove_if(&irc_to_lower(&old), |_, v| v == uid);
        self.nicks.insert(irc_to_lower(new_nick), uid.to_string());
        true
    }

    pub fn get(&self, uid: &str) -> Option<Client> {
        self.clients.get(uid).map(|e| e.client.clone())
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.clients.contains_key(uid)
    }

    pub fn find_by_nick(&self, nick: &str) -> Option<Client> {
        let uid = self.nicks.get(&irc_to_lower(nick))?.value().clone();
        self.get(&uid)
    }

    pub fn nick_of(&self, uid: &str) -> Option<String> {
        self.clients.get(uid).map(|e| e.client.nick.clone())
    }

    /// Snapshot of a client's back-references.
    pub fn memberships(&self, uid: &str) -> Option<Memberships> {
        self.clients.get(uid).map(|e| e.links.clone())
    }

    /// Mutate a client's back-references. No-op for unknown clients.
    pub(crate) fn with_links<R>(&self, uid: &str, f: impl FnOnce(&mut Memberships) -> R) -> Option<R> {
        self.clients.get_mut(uid).map(|mut e| f(&mut e.links))
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
