//! Shared fixtures for the registry integration tests.
//!
//! Each [`TestServer`] is one server's channel registry with a manual clock
//! and an event log, so tests can step time and inspect what would have
//! been broadcast.

#![allow(dead_code)]

use slircd_chanstate::config::Config;
use slircd_chanstate::state::channel::{SjoinAnnouncement, SjoinRequest};
use slircd_chanstate::state::{
    ChannelEvent, ChannelObserver, ChannelRegistry, ClientTable, EventLog, ManualClock, Uid,
};
use std::sync::Arc;

/// Start of every test clock.
pub const T0: i64 = 1_000_000;

pub struct TestServer {
    pub name: String,
    pub registry: Arc<ChannelRegistry>,
    pub clients: Arc<ClientTable>,
    pub clock: Arc<ManualClock>,
    pub events: Arc<EventLog>,
}

impl TestServer {
    pub fn new(name: &str) -> Self {
        Self::with_sid(name, "001")
    }

    /// A server with its own SID, for tests linking several servers.
    pub fn with_sid(name: &str, sid: &str) -> Self {
        let mut config = Config::default();
        config.server.name = name.to_string();
        config.server.sid = sid.to_string();
        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Self {
        let name = config.server.name.clone();
        let clients = Arc::new(ClientTable::new(config.server.sid.clone()));
        let clock = Arc::new(ManualClock::new(T0));
        let events = Arc::new(EventLog::new());
        let observer: Arc<dyn ChannelObserver> = Arc::clone(&events) as Arc<dyn ChannelObserver>;
        let registry = Arc::new(ChannelRegistry::new(
            config,
            Arc::clone(&clients),
            clock.clone(),
            observer,
        ));
        Self {
            name,
            registry,
            clients,
            clock,
            events,
        }
    }

    /// Register a local client whose host is `<nick>.example`.
    pub fn local(&self, nick: &str) -> Uid {
        self.clients
            .register_local(nick, nick, &format!("{nick}.example"), "192.0.2.1")
    }

    pub fn local_at(&self, nick: &str, user: &str, host: &str) -> Uid {
        self.clients.register_local(nick, user, host, "192.0.2.2")
    }

    /// Register a client introduced over `link`.
    pub fn remote(&self, uid: &str, nick: &str, link: &str) -> Uid {
        self.clients.register_remote(
            uid,
            nick,
            nick,
            &format!("{nick}.remote"),
            "198.51.100.1",
            link,
        )
    }

    pub fn advance(&self, secs: i64) {
        self.clock.advance(secs);
    }

    /// Rendered lines of every mode change recorded since the last call.
    pub fn mode_lines(&self) -> Vec<String> {
        self.events
            .take()
            .into_iter()
            .filter_map(|e| match e {
                ChannelEvent::ModeChanged { diff, .. } => Some(diff.render().to_line()),
                _ => None,
            })
            .collect()
    }
}

/// Split a mode string into letter tokens and parameters,
/// e.g. `"+o-v a b"` -> (`["+o-v"]`, `["a", "b"]`).
pub fn mode_args(line: &str) -> (Vec<String>, Vec<String>) {
    let mut words = line.split_whitespace().map(str::to_string);
    let tokens = words.next().into_iter().collect();
    (tokens, words.collect())
}

pub fn sjoin(channel: &str, ts: i64, modes: &str, members: &[&str], link: &str) -> SjoinRequest {
    let (mode_tokens, params) = mode_args(modes);
    SjoinRequest {
        channel: channel.to_string(),
        ts,
        mode_tokens,
        params,
        members: members.iter().map(|m| m.to_string()).collect(),
        link: link.to_string(),
    }
}

/// Deliver `announcement` as if it crossed the link into `to`.
pub fn deliver(to: &TestServer, announcement: SjoinAnnouncement, link: &str) {
    to.registry.sjoin(&announcement.into_request(link));
}
