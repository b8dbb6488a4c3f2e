//! Integration tests for MODE requests through the registry.

mod common;

use common::{TestServer, mode_args};
use slircd_chanstate::error::ChannelError;
use slircd_chanstate::state::channel::{DiffGroup, ListKind, ModeChangeOutcome, Tier, Visibility};
use slircd_chanstate::state::{Actor, Uid};

fn mode(srv: &TestServer, actor: &Actor, line: &str) -> ModeChangeOutcome {
    let (tokens, params) = mode_args(line);
    srv.registry
        .set_mode("#test", actor, &tokens, &params)
        .expect("channel exists")
}

fn lines(out: &ModeChangeOutcome) -> Vec<String> {
    out.diffs.iter().map(|d| d.render().to_line()).collect()
}

/// `#test` with a founding op followed by `nicks` as peons.
fn channel_with(srv: &TestServer, nicks: &[&str]) -> (Actor, Vec<Uid>) {
    let op = srv.local("op");
    srv.registry.join("#test", &op, None).unwrap();
    let uids = nicks
        .iter()
        .map(|n| {
            let uid = srv.local(n);
            srv.registry.join("#test", &uid, None).unwrap();
            uid
        })
        .collect();
    srv.events.take();
    (Actor::Client(op), uids)
}

#[test]
fn test_four_deops_fit_one_diff() {
    let srv = TestServer::new("irc.test");
    let (op, uids) = channel_with(&srv, &["nick1", "nick2", "nick3", "nick4"]);
    mode(&srv, &op, "+oooo nick1 nick2 nick3 nick4");
    for uid in &uids {
        assert_eq!(srv.registry.tier_of("#test", uid), Some(Tier::ChanOp));
    }

    let out = mode(&srv, &op, "-o-o-o-o nick1 nick2 nick3 nick4");
    assert!(out.errors.is_empty());
    assert_eq!(lines(&out), ["-oooo nick1 nick2 nick3 nick4"]);
    assert_eq!(out.diffs[0].group, DiffGroup::Standard);
    assert_eq!(out.diffs[0].visibility, Visibility::AllMembers);
    assert!(out.diffs[0].setter.starts_with("op!"));
}

#[test]
fn test_fifth_deop_forces_second_diff() {
    let srv = TestServer::new("irc.test");
    let (op, _) = channel_with(&srv, &["n1", "n2", "n3", "n4", "n5"]);
    mode(&srv, &op, "+ooooo n1 n2 n3 n4 n5");
    let out = mode(&srv, &op, "-ooooo n1 n2 n3 n4 n5");
    assert_eq!(lines(&out), ["-oooo n1 n2 n3 n4", "-o n5"]);

    let events = srv.mode_lines();
    assert_eq!(events.len(), 4);
    assert_eq!(events[2..], ["-oooo n1 n2 n3 n4", "-o n5"]);
}

#[test]
fn test_halfop_cannot_op_but_may_devoice() {
    let srv = TestServer::new("irc.test");
    let (op, uids) = channel_with(&srv, &["half", "target", "voiced"]);
    mode(&srv, &op, "+hv half voiced");
    let half = Actor::Client(uids[0].clone());

    let out = mode(&srv, &half, "+o target");
    assert_eq!(out.errors, [ChannelError::InsufficientPrivilege]);
    assert!(out.diffs.is_empty());
    assert_eq!(srv.registry.tier_of("#test", &uids[1]), Some(Tier::Peon));

    let out = mode(&srv, &half, "-v voiced");
    assert!(out.errors.is_empty());
    assert_eq!(lines(&out), ["-v voiced"]);
    assert_eq!(srv.registry.tier_of("#test", &uids[2]), Some(Tier::Peon));
}

#[test]
fn test_repeated_request_is_idempotent() {
    let srv = TestServer::new("irc.test");
    let (op, _) = channel_with(&srv, &["v"]);
    let first = mode(&srv, &op, "+mlv 10 v");
    assert_eq!(lines(&first), ["+mlv 10 v"]);
    let second = mode(&srv, &op, "+mlv 10 v");
    assert!(!second.changed());
    assert!(second.errors.is_empty());
}

#[test]
fn test_peon_is_refused_once_per_request() {
    let srv = TestServer::new("irc.test");
    let (_, uids) = channel_with(&srv, &["peon"]);
    let peon = Actor::Client(uids[0].clone());
    let out = mode(&srv, &peon, "+mik key");
    assert_eq!(out.errors, [ChannelError::InsufficientPrivilege]);
    assert!(out.diffs.is_empty());
}

#[test]
fn test_outsider_may_list_bans_but_not_change() {
    let srv = TestServer::new("irc.test");
    let (op, _) = channel_with(&srv, &[]);
    mode(&srv, &op, "+b bad!*@*");
    let stranger = Actor::Client(srv.local("stranger"));

    let out = mode(&srv, &stranger, "b");
    assert!(out.errors.is_empty());
    assert_eq!(out.lists.len(), 1);
    assert_eq!(out.lists[0].kind, ListKind::Ban);
    assert_eq!(out.lists[0].entries[0].mask, "bad!*@*");

    let out = mode(&srv, &stranger, "-b bad!*@*");
    assert_eq!(out.errors, [ChannelError::InsufficientPrivilege]);
}

#[test]
fn test_modes_render_back_into_same_state() {
    let srv = TestServer::new("irc.test");
    let (op, _) = channel_with(&srv, &[]);
    mode(&srv, &op, "+smlk 7 hunter2");

    let shown = srv.registry.channel_modes("#test", &op).unwrap();
    assert_eq!(shown.to_line(), "+smtnlk 7 hunter2");

    let other = TestServer::new("irc.other");
    let founder = other.local("founder");
    other.registry.join("#test", &founder, None).unwrap();
    let replay = format!("{} {}", shown.letters, shown.params.join(" "));
    mode(&other, &Actor::Client(founder.clone()), &replay);
    assert_eq!(
        other
            .registry
            .channel_modes("#test", &Actor::Client(founder))
            .unwrap(),
        shown
    );
}

#[test]
fn test_hidden_ops_routes_privilege_changes() {
    let srv = TestServer::new("irc.test");
    let (op, uids) = channel_with(&srv, &["v", "p"]);
    mode(&srv, &op, "+v v");

    let out = mode(&srv, &op, "+a");
    assert_eq!(lines(&out), ["+a", "-ov op v"]);
    assert_eq!(out.diffs[0].visibility, Visibility::AllMembers);
    assert_eq!(out.diffs[1].visibility, Visibility::NonOps);
    assert_eq!(out.diffs[1].setter, "irc.test");

    let out = mode(&srv, &op, "+v p");
    let routes: Vec<_> = out
        .diffs
        .iter()
        .map(|d| (d.group, d.visibility.clone()))
        .collect();
    assert_eq!(
        routes,
        [
            (DiffGroup::Standard, Visibility::Member(uids[1].clone())),
            (DiffGroup::Privileged, Visibility::ChanOps),
        ]
    );

    let out = mode(&srv, &op, "-a");
    assert_eq!(lines(&out), ["-a", "+ovv op v p"]);
    assert_eq!(out.diffs[0].visibility, Visibility::AllMembers);
}

#[test]
fn test_server_and_untimestamped_remote_are_trusted() {
    let srv = TestServer::new("irc.test");
    let (_, uids) = channel_with(&srv, &["someone"]);

    let out = mode(&srv, &Actor::Server("services.test".into()), "+o someone");
    assert!(out.errors.is_empty());
    assert_eq!(out.diffs[0].setter, "services.test");
    assert_eq!(srv.registry.tier_of("#test", &uids[0]), Some(Tier::ChanOp));

    let remote = srv.remote("002AAAAAA", "far", "hub.test");
    let out = mode(&srv, &Actor::Client(remote.clone()), "+m");
    assert!(out.errors.is_empty(), "remote errors are never reported");
    assert!(out.diffs.is_empty());

    srv.registry
        .sjoin(&common::sjoin("#test", 0, "+", &[], "hub.test"))
        .unwrap();
    assert_eq!(srv.registry.inspect("#test", |c| c.ts), Some(0));
    let out = mode(&srv, &Actor::Client(remote), "+m");
    assert_eq!(lines(&out), ["+m"]);
}

#[test]
fn test_missing_channel_and_unknown_actor() {
    let srv = TestServer::new("irc.test");
    let (op, _) = channel_with(&srv, &[]);
    let (tokens, params) = mode_args("+m");
    assert_eq!(
        srv.registry.set_mode("#nowhere", &op, &tokens, &params).unwrap_err(),
        ChannelError::ChannelNotFound("#nowhere".into())
    );
    assert_eq!(
        srv.registry
            .set_mode("#test", &Actor::Client("999XXXXXX".into()), &tokens, &params)
            .unwrap_err(),
        ChannelError::SessionInvalid
    );
}
