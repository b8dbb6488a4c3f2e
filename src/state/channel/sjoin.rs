//! SJOIN reconciliation for one channel.
//!
//! A peer announces its view of a channel: creation timestamp, modes, list
//! entries and prefixed members. The timestamp decides whose modes and
//! privileges survive. Lower wins; zero means "no authority" and merges.

use super::diff::{DiffBuilder, DiffGroup, ModeDiff, Route, Visibility};
use super::lists::ListKind;
use super::mode_change::{ModeEnv, replay_privileges};
use super::modes::{ModeFlags, ModeState, ModeStep, RenderedModes};
use super::roster::Tier;
use super::Channel;
use crate::error::ChannelError;
use crate::state::Uid;
use crate::state::client::ClientTable;
use tracing::{debug, info};

/// An SJOIN as received from a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SjoinRequest {
    pub channel: String,
    pub ts: i64,
    pub mode_tokens: Vec<String>,
    pub params: Vec<String>,
    /// Member tokens such as `@alice`, `+bob`, `@+carol`, `dave`.
    pub members: Vec<String>,
    /// Name of the link the announcement arrived on.
    pub link: String,
}

/// Channel state as announced to (or onward from) a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SjoinAnnouncement {
    pub channel: String,
    pub ts: i64,
    pub modes: RenderedModes,
    pub lists: Vec<(ListKind, String)>,
    pub members: Vec<String>,
}

/// Which side kept authority after a collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SjoinWinner {
    /// Our modes and privileges stand; the peer's claims were downgraded.
    Local,
    /// The peer's view replaced ours; local privileges were stripped.
    Remote,
}

/// What one SJOIN changed.
#[derive(Debug, Clone)]
pub struct SjoinOutcome {
    /// Members added by this announcement.
    pub joined: Vec<(Uid, Tier)>,
    pub diffs: Vec<ModeDiff>,
    pub winner: Option<SjoinWinner>,
    /// Local members stripped of privileges.
    pub deposed: Vec<Uid>,
    /// What to send onward to the rest of the network.
    pub announcement: SjoinAnnouncement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Verdict {
    keep_our: bool,
    keep_new: bool,
    ts: i64,
}

fn decide(
    is_new: bool,
    local_ts: i64,
    remote_ts: i64,
    local_has_ops: bool,
    remote_has_ops: bool,
) -> Verdict {
    let both = |ts| Verdict { keep_our: true, keep_new: true, ts };
    let ours = Verdict { keep_our: true, keep_new: false, ts: local_ts };
    let theirs = Verdict { keep_our: false, keep_new: true, ts: remote_ts };

    if is_new {
        return both(remote_ts);
    }
    if local_ts == 0 || remote_ts == 0 {
        return both(0);
    }
    if remote_ts == local_ts {
        return both(local_ts);
    }

    if remote_ts < local_ts {
        // An opless burst never deposes our ops.
        if !remote_has_ops && local_has_ops { ours } else { theirs }
    } else if remote_has_ops && !local_has_ops {
        theirs
    } else {
        ours
    }
}

/// Split a member token into its tier and bare nick.
pub fn parse_member(token: &str) -> (Tier, &str) {
    let nick = token.trim_start_matches(['@', '%', '+']);
    let prefixes = &token[..token.len() - nick.len()];
    (Tier::from_prefixes(prefixes), nick)
}

fn member_route(tier: Tier) -> Option<(Route, char)> {
    let letter = tier.mode_letter()?;
    let route = if tier == Tier::HalfOp { Route::HalfOp } else { Route::Member };
    Some((route, letter))
}

/// Broadcast one privilege grant or removal the way the MODE engine would.
fn push_member(
    diffs: &mut DiffBuilder,
    channel: &Channel,
    env: &ModeEnv<'_>,
    setter: &str,
    change: (bool, Tier, &Uid, &str),
) {
    let (adding, tier, uid, nick) = change;
    let Some((route, letter)) = member_route(tier) else {
        return;
    };
    let step = ModeStep { adding, letter, param: Some(nick.to_string()) };
    let hidden = channel.has(ModeFlags::HIDE_OPS);
    let new_tier = if adding { tier } else { Tier::Peon };
    if hidden && !new_tier.is_privileged() {
        // Outside the ops audience, so the target hears about it directly.
        diffs.push(
            DiffGroup::Standard,
            Visibility::Member(uid.clone()),
            env.server_name,
            step.clone(),
        );
    }
    diffs.route(route, hidden, setter, env.server_name, step);
}

/// Merge a peer's announcement into `channel`.
///
/// `is_new` is true when the channel was created for this SJOIN. The caller
/// has already rejected local-only and malformed names.
pub fn apply_sjoin(
    channel: &mut Channel,
    req: &SjoinRequest,
    env: &ModeEnv<'_>,
    is_new: bool,
) -> SjoinOutcome {
    let (remote_modes, remote_lists) = ModeState::from_burst(&req.mode_tokens, &req.params);
    let members: Vec<(Tier, &str)> = req
        .members
        .iter()
        .map(|t| parse_member(t))
        .filter(|(_, nick)| !nick.is_empty())
        .collect();

    let remote_has_ops = members.iter().any(|(t, _)| *t == Tier::ChanOp);
    let local_has_ops = channel.roster.op_count() > 0;
    let verdict = decide(is_new, channel.ts, req.ts, local_has_ops, remote_has_ops);

    if verdict.ts != channel.ts {
        info!(
            channel = %channel.name,
            local_ts = channel.ts,
            remote_ts = req.ts,
            new_ts = verdict.ts,
            link = %req.link,
            "SJOIN timestamp change"
        );
    }

    let setter = req.link.as_str();
    let mut diffs = DiffBuilder::new(env.limits.max_mode_params);
    let hidden_before = channel.has(ModeFlags::HIDE_OPS);

    let new_modes = if !verdict.keep_new {
        channel.modes.clone()
    } else if verdict.keep_our {
        channel.modes.union(&remote_modes)
    } else {
        remote_modes
    };
    let steps = channel.modes.diff(&new_modes);
    channel.modes = new_modes;
    channel.ts = verdict.ts;
    let hidden = channel.has(ModeFlags::HIDE_OPS);
    for step in steps {
        if step.letter == 'a' {
            diffs.push(DiffGroup::Standard, Visibility::AllMembers, setter, step);
        } else {
            diffs.route(Route::Flag, hidden, setter, env.server_name, step);
        }
    }
    if hidden != hidden_before {
        replay_privileges(channel, env, hidden, &mut diffs);
    }

    let mut deposed = Vec::new();
    if !verdict.keep_our {
        deposed = depose_all(channel, env, setter, &mut diffs);
        for kind in [ListKind::Ban, ListKind::Exception, ListKind::InviteException] {
            for entry in channel.lists.clear(kind) {
                diffs.route(
                    Route::List(kind),
                    hidden,
                    setter,
                    env.server_name,
                    ModeStep { adding: false, letter: kind.mode_letter(), param: Some(entry.mask) },
                );
            }
        }
    }

    let mut accepted_lists = Vec::new();
    if verdict.keep_new {
        for (letter, mask) in remote_lists {
            let Some(kind) = ListKind::from_letter(letter) else {
                continue;
            };
            match channel.lists.add(kind, &mask, setter, env.now, None) {
                Ok(()) => {
                    diffs.route(
                        Route::List(kind),
                        hidden,
                        setter,
                        env.server_name,
                        ModeStep { adding: true, letter, param: Some(mask.clone()) },
                    );
                    accepted_lists.push((kind, mask));
                }
                Err(ChannelError::Duplicate) => accepted_lists.push((kind, mask)),
                Err(err) => debug!(channel = %channel.name, error = %err, "burst list entry dropped"),
            }
        }
    }

    let mut joined = Vec::new();
    let mut announced = Vec::new();
    for (burst_tier, nick) in members {
        let Some(client) = env.clients.find_by_nick(nick) else {
            debug!(channel = %channel.name, nick = %nick, "SJOIN member unknown, ignored");
            continue;
        };
        if !client.arrived_via(&req.link) {
            debug!(
                channel = %channel.name,
                nick = %nick,
                link = %req.link,
                "SJOIN member from wrong direction, ignored"
            );
            continue;
        }

        let tier = if verdict.keep_new { burst_tier } else { Tier::Peon };
        match channel.tier_of(&client.uid) {
            None => {
                channel.add_member(&client.uid, tier, false, env.now);
                joined.push((client.uid.clone(), tier));
                push_member(&mut diffs, channel, env, setter, (true, tier, &client.uid, &client.nick));
            }
            Some(current) if tier > current => {
                channel.roster.change_tier(&client.uid, tier);
                push_member(&mut diffs, channel, env, setter, (true, tier, &client.uid, &client.nick));
            }
            Some(_) => {}
        }

        announced.push(match tier.prefix() {
            Some(p) => format!("{}{}", p, client.nick),
            None => client.nick.clone(),
        });
    }

    let winner = match (verdict.keep_our, verdict.keep_new) {
        (false, _) => Some(SjoinWinner::Remote),
        (true, false) => Some(SjoinWinner::Local),
        (true, true) => None,
    };
    if let Some(winner) = winner {
        info!(
            channel = %channel.name,
            winner = ?winner,
            deposed = deposed.len(),
            "SJOIN conflict resolved"
        );
    }

    SjoinOutcome {
        joined,
        diffs: diffs.finish(),
        winner,
        deposed,
        announcement: SjoinAnnouncement {
            channel: channel.name.clone(),
            ts: channel.ts,
            modes: channel.modes.render(true),
            lists: accepted_lists,
            members: announced,
        },
    }
}

/// Strip every local privilege, returning the affected members.
fn depose_all(
    channel: &mut Channel,
    env: &ModeEnv<'_>,
    setter: &str,
    diffs: &mut DiffBuilder,
) -> Vec<Uid> {
    let privileged: Vec<(Uid, Tier)> = channel
        .roster
        .iter()
        .filter(|(_, t)| *t != Tier::Peon)
        .map(|(u, t)| (u.clone(), t))
        .collect();

    let mut deposed = Vec::with_capacity(privileged.len());
    for (uid, tier) in privileged {
        channel.roster.change_tier(&uid, Tier::Peon);
        let nick = env.clients.nick_of(&uid).unwrap_or_else(|| uid.clone());
        push_member(diffs, channel, env, setter, (false, tier, &uid, &nick));
        deposed.push(uid);
    }
    deposed
}

/// The SJOIN this server would send for `channel` over `to_link`.
///
/// Members that arrived over `to_link` are left out; the peer already
/// knows them.
pub fn announce(channel: &Channel, clients: &ClientTable, to_link: &str) -> SjoinAnnouncement {
    let members = channel
        .roster
        .iter()
        .filter_map(|(uid, tier)| {
            let client = clients.get(uid)?;
            if client.arrived_via(to_link) {
                return None;
            }
            Some(match tier.prefix() {
                Some(p) => format!("{}{}", p, client.nick),
                None => client.nick,
            })
        })
        .collect();

    let lists = [ListKind::Ban, ListKind::Exception, ListKind::InviteException]
        .into_iter()
        .flat_map(|kind| {
            channel
                .lists
                .entries(kind)
                .iter()
                .map(move |e| (kind, e.mask.clone()))
        })
        .collect();

    SjoinAnnouncement {
        channel: channel.name.clone(),
        ts: channel.ts,
        modes: channel.modes.render(true),
        lists,
        members,
    }
}

impl SjoinAnnouncement {
    /// Turn an announcement back into a request as a peer would receive it.
    pub fn into_request(self, link: &str) -> SjoinRequest {
        let mut mode_tokens = vec![self.modes.letters];
        let mut params = self.modes.params;
        for (kind, mask) in self.lists {
            mode_tokens.push(format!("+{}", kind.mode_letter()));
            params.push(mask);
        }
        SjoinRequest {
            channel: self.channel,
            ts: self.ts,
            mode_tokens,
            params,
            members: self.members,
            link: link.to_string(),
        }
    }
}
