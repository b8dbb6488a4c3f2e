//! Integration tests for the virtual channel overlay.

mod common;

use common::{T0, TestServer, sjoin};
use slircd_chanstate::config::Config;
use slircd_chanstate::error::ChannelError;
use slircd_chanstate::state::channel::{ModeFlags, Tier};
use slircd_chanstate::state::{Actor, ChannelEvent};

fn sub_name(offset: i64) -> String {
    format!("##chat_{}", T0 + offset)
}

#[test]
fn test_create_sub_routes_creator() {
    let srv = TestServer::new("irc.test");
    let alice = srv.local("alice");
    let bob = srv.local("bob");
    srv.registry.join("#chat", &alice, None).unwrap();
    srv.events.take();

    let sub = srv.registry.create_sub("#chat", &bob).unwrap();
    assert_eq!(sub, sub_name(0));
    assert_eq!(srv.registry.tier_of(&sub, &bob), Some(Tier::ChanOp));
    assert!(srv.registry.inspect(&sub, |c| c.has(ModeFlags::NO_PRIVMSGS)).unwrap());
    assert_eq!(srv.registry.resolve("#chat", &bob), Some(sub.clone()));
    assert_eq!(srv.registry.resolve("#CHAT", &alice), Some("#chat".to_string()));
    assert_eq!(srv.registry.resolve("#chat", &srv.local("carol")), None);

    let links = srv.clients.memberships(&bob).unwrap();
    assert_eq!(links.vchans.get("#chat"), Some(&sub));
    assert!(links.channels.contains(&sub));

    assert!(srv.events.take().iter().any(|e| matches!(
        e,
        ChannelEvent::MemberJoined { channel, tier: Tier::ChanOp, .. } if *channel == sub
    )));
}

#[test]
fn test_one_instance_per_family() {
    let srv = TestServer::new("irc.test");
    let alice = srv.local("alice");
    let bob = srv.local("bob");
    srv.registry.join("#chat", &alice, None).unwrap();
    let sub = srv.registry.create_sub("#chat", &bob).unwrap();

    assert_eq!(
        srv.registry.join("#chat", &bob, None),
        Err(ChannelError::AlreadyOnSubchan("#chat".into()))
    );
    assert_eq!(
        srv.registry.create_sub("#chat", &bob),
        Err(ChannelError::AlreadyOnSubchan("#chat".into()))
    );
    assert_eq!(
        srv.registry.create_sub("#chat", &alice),
        Err(ChannelError::AlreadyOnSubchan("#chat".into()))
    );
    assert_eq!(
        srv.registry.join(&sub, &alice, None),
        Err(ChannelError::AlreadyOnSubchan("#chat".into()))
    );
}

#[test]
fn test_sub_names_step_past_collisions() {
    let srv = TestServer::new("irc.test");
    let alice = srv.local("alice");
    srv.registry.join("#chat", &alice, None).unwrap();
    let first = srv.registry.create_sub("#chat", &srv.local("b1")).unwrap();
    let second = srv.registry.create_sub("#chat", &srv.local("b2")).unwrap();
    assert_eq!(first, sub_name(0));
    assert_eq!(second, sub_name(1));
    assert_eq!(
        srv.registry.create_sub("##nope", &srv.local("b3")),
        Err(ChannelError::ChannelNotFound("##nope".into()))
    );
    assert_eq!(
        srv.registry.create_sub(&first, &srv.local("b4")),
        Err(ChannelError::BadChannelName(first.clone()))
    );
}

#[test]
fn test_family_limit_and_disabled_overlay() {
    let mut config = Config::default();
    config.vchans.max_per_channel = 1;
    let srv = TestServer::with_config(config);
    let alice = srv.local("alice");
    srv.registry.join("#chat", &alice, None).unwrap();
    srv.registry.create_sub("#chat", &srv.local("b1")).unwrap();

    let b2 = srv.local("b2");
    assert_eq!(
        srv.registry.create_sub("#chat", &b2),
        Err(ChannelError::VchanLimit("#chat".into()))
    );
    assert!(!srv.registry.exists(&sub_name(1)));
    assert!(srv.clients.memberships(&b2).unwrap().channels.is_empty());

    let mut config = Config::default();
    config.vchans.enabled = false;
    let off = TestServer::with_config(config);
    let a = off.local("a");
    off.registry.join("#chat", &a, None).unwrap();
    assert_eq!(
        off.registry.create_sub("#chat", &off.local("b")),
        Err(ChannelError::VchanLimit("#chat".into()))
    );
}

#[test]
fn test_join_vchan_follows_member_and_root_name_routes() {
    let srv = TestServer::new("irc.test");
    let alice = srv.local("alice");
    let bob = srv.local("bob");
    let carol = srv.local("carol");
    srv.registry.join("#chat", &alice, None).unwrap();
    let sub = srv.registry.create_sub("#chat", &bob).unwrap();

    let joined = srv.registry.join_vchan("#chat", &carol, "BOB", None).unwrap();
    assert_eq!(joined.channel, sub);
    assert_eq!(joined.tier, Tier::Peon);
    assert_eq!(srv.registry.resolve("#chat", &carol), Some(sub.clone()));

    let bob_actor = Actor::Client(bob.clone());
    srv.registry
        .set_mode("#chat", &bob_actor, &["+m".into()], &[])
        .unwrap();
    assert!(srv.registry.inspect(&sub, |c| c.has(ModeFlags::MODERATED)).unwrap());
    assert!(!srv.registry.inspect("#chat", |c| c.has(ModeFlags::MODERATED)).unwrap());

    srv.registry.part("#chat", &carol, None).unwrap();
    assert_eq!(srv.registry.tier_of(&sub, &carol), None);
    assert!(srv.clients.memberships(&carol).unwrap().vchans.is_empty());

    let dave = srv.local("dave");
    let joined = srv.registry.join_vchan("#chat", &dave, "alice", None).unwrap();
    assert_eq!(joined.channel, "#chat");
    assert_eq!(
        srv.registry.join_vchan("#chat", &srv.local("erin"), "nobody", None),
        Err(ChannelError::NoSuchNick("nobody".into()))
    );
    srv.local("loner");
    assert_eq!(
        srv.registry.join_vchan("#chat", &srv.local("fred"), "loner", None),
        Err(ChannelError::UserNotInChannel("loner".into()))
    );
}

#[test]
fn test_list_vchans_and_representatives() {
    let srv = TestServer::new("irc.test");
    let alice = srv.local("alice");
    let bob = srv.local("bob");
    let carol = srv.local("carol");
    srv.registry.join("#chat", &alice, None).unwrap();
    let sub = srv.registry.create_sub("#chat", &bob).unwrap();
    srv.registry.join(&sub, &carol, None).unwrap();

    let family = srv.registry.list_vchans("#chat").unwrap();
    assert_eq!(family.len(), 2);
    assert_eq!(family[0].name, "#chat");
    assert_eq!(family[0].representative.as_deref(), Some("alice"));
    assert_eq!(family[0].members, 1);
    assert_eq!(family[1].name, sub);
    assert_eq!(family[1].representative.as_deref(), Some("bob"));
    assert_eq!(family[1].members, 2);

    srv.registry.part(&sub, &bob, None).unwrap();
    assert_eq!(
        srv.registry.pick_representative_id(&sub).unwrap().as_deref(),
        Some("carol")
    );
    srv.registry.part(&sub, &carol, None).unwrap();
    assert_eq!(
        srv.registry.pick_representative_id(&sub).unwrap().as_deref(),
        Some("carol")
    );
    assert_eq!(
        srv.registry.inspect(&sub, |c| c.vchan_id.clone()).flatten().as_deref(),
        Some("carol")
    );
    assert_eq!(
        srv.registry.pick_representative_id("#gone"),
        Err(ChannelError::ChannelNotFound("#gone".into()))
    );
}

#[test]
fn test_root_outlives_members_while_subs_exist() {
    let srv = TestServer::new("irc.test");
    let alice = srv.local("alice");
    let bob = srv.local("bob");
    srv.registry.join("#chat", &alice, None).unwrap();
    let sub = srv.registry.create_sub("#chat", &bob).unwrap();

    srv.advance(2000);
    srv.registry.part("#chat", &alice, None).unwrap();
    assert!(srv.registry.exists("#chat"));
    srv.registry.part("#chat", &bob, None).unwrap();
    assert!(srv.registry.exists(&sub));

    srv.advance(3599);
    assert_eq!(srv.registry.reap(), 0);
    srv.advance(1);
    srv.registry.reap();
    assert!(!srv.registry.exists(&sub));
    assert!(!srv.registry.exists("#chat"));
    assert!(srv.registry.is_empty());
}

#[test]
fn test_burst_members_join_the_family_cache() {
    let srv = TestServer::new("irc.test");
    let alice = srv.local("alice");
    let bob = srv.local("bob");
    let remote = srv.remote("002AAAAAR", "R", "hub.test");
    srv.registry.join("#chat", &alice, None).unwrap();
    let sub = srv.registry.create_sub("#chat", &bob).unwrap();
    srv.registry.invite(&sub, &bob, "R").unwrap();
    assert!(srv.clients.memberships(&remote).unwrap().invited.contains(&sub));

    let ts = srv.registry.inspect(&sub, |c| c.ts).unwrap();
    let out = srv.registry.sjoin(&sjoin(&sub, ts, "+", &["R"], "hub.test")).unwrap();
    assert_eq!(out.joined, [(remote.clone(), Tier::Peon)]);

    let links = srv.clients.memberships(&remote).unwrap();
    assert_eq!(links.vchans.get("#chat"), Some(&sub));
    assert!(!links.invited.contains(&sub));
    assert_eq!(srv.registry.resolve("#chat", &remote), Some(sub));
    assert_eq!(
        srv.registry.create_sub("#chat", &remote),
        Err(ChannelError::AlreadyOnSubchan("#chat".into()))
    );
}
