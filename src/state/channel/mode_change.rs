//! The MODE engine.
//!
//! A request is a stream of sign characters and mode letters plus a separate
//! parameter stream. The current sign (`+`, `-`, or the `=` query sign)
//! persists until the next sign character. Each letter is authorized and
//! applied on its own; a rejected letter never stops the ones after it.

use super::diff::{DiffBuilder, DiffGroup, ModeDiff, Route, Visibility};
use super::lists::{ListEntry, ListKind};
use super::modes::{ModeFlags, ModeStep};
use super::roster::Tier;
use super::Channel;
use crate::config::ChannelLimitsConfig;
use crate::error::ChannelError;
use crate::state::client::{Client, ClientTable};
use crate::util::normalize_mask;
use std::collections::HashSet;
use tracing::debug;

/// The resolved origin of a mode request.
#[derive(Debug, Clone)]
pub enum Source {
    Server(String),
    Local(Client),
    Remote(Client),
}

impl Source {
    pub fn from_client(client: Client) -> Self {
        if client.is_local() {
            Source::Local(client)
        } else {
            Source::Remote(client)
        }
    }

    /// Display identity used for attribution.
    pub fn identity(&self) -> String {
        match self {
            Source::Server(name) => name.clone(),
            Source::Local(c) | Source::Remote(c) => c.hostmask(),
        }
    }

    pub fn uid(&self) -> Option<&str> {
        match self {
            Source::Server(_) => None,
            Source::Local(c) | Source::Remote(c) => Some(&c.uid),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Source::Local(_))
    }

    pub fn is_server(&self) -> bool {
        matches!(self, Source::Server(_))
    }
}

/// Everything outside the channel the engine reads.
pub struct ModeEnv<'a> {
    pub clients: &'a ClientTable,
    pub limits: &'a ChannelLimitsConfig,
    pub server_name: &'a str,
    pub now: i64,
}

/// A list returned to the requester instead of a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListReply {
    pub kind: ListKind,
    pub entries: Vec<ListEntry>,
}

/// Result of one mode request.
#[derive(Debug, Clone, Default)]
pub struct ModeChangeOutcome {
    pub diffs: Vec<ModeDiff>,
    /// Errors for the requester, each at most once. Always empty for
    /// servers and remote clients.
    pub errors: Vec<ChannelError>,
    pub lists: Vec<ListReply>,
}

impl ModeChangeOutcome {
    pub fn changed(&self) -> bool {
        !self.diffs.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sign {
    Add,
    Del,
    Query,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Authority {
    Unlimited,
    Member(Tier),
    Outsider,
}

impl Authority {
    fn at_least(self, tier: Tier) -> bool {
        match self {
            Authority::Unlimited => true,
            Authority::Member(t) => t >= tier,
            Authority::Outsider => false,
        }
    }
}

/// Apply a mode request to `channel`.
pub fn apply_mode_change(
    channel: &mut Channel,
    source: &Source,
    env: &ModeEnv<'_>,
    mode_tokens: &[String],
    params: &[String],
) -> ModeChangeOutcome {
    let mut engine = Engine::new(channel, source, env);
    let mut params = params.iter().map(String::as_str);
    let mut sign = Sign::Add;

    for c in mode_tokens.iter().flat_map(|t| t.chars()) {
        match c {
            '+' => sign = Sign::Add,
            '-' => sign = Sign::Del,
            '=' => sign = Sign::Query,
            'o' | 'h' | 'v' => {
                let param = if sign == Sign::Query { None } else { params.next() };
                engine.member_mode(c, sign, param);
            }
            'k' => {
                let param = if sign == Sign::Query { None } else { params.next() };
                engine.key(sign, param);
            }
            'l' => {
                let param = if sign == Sign::Add { params.next() } else { None };
                engine.limit(sign, param);
            }
            'b' | 'e' | 'I' => {
                let param = if sign == Sign::Query { None } else { params.next() };
                if let Some(kind) = ListKind::from_letter(c) {
                    engine.list(kind, sign, param);
                }
            }
            other => match ModeFlags::from_simple_letter(other) {
                Some(flag) => engine.simple(flag, other, sign),
                None => engine.unknown(other),
            },
        }
    }

    engine.finish()
}

struct Engine<'c, 'e> {
    channel: &'c mut Channel,
    source: &'e Source,
    env: &'e ModeEnv<'e>,
    authority: Authority,
    setter: String,
    hidden_at_start: bool,
    seen_flags: ModeFlags,
    key_done: bool,
    limit_done: bool,
    unknown_reported: bool,
    listed: HashSet<ListKind>,
    errors: Vec<ChannelError>,
    lists: Vec<ListReply>,
    diffs: DiffBuilder,
}

impl<'c, 'e> Engine<'c, 'e> {
    fn new(channel: &'c mut Channel, source: &'e Source, env: &'e ModeEnv<'e>) -> Self {
        let authority = match source {
            Source::Server(_) => Authority::Unlimited,
            Source::Remote(_) if channel.ts == 0 => Authority::Unlimited,
            Source::Local(c) | Source::Remote(c) => match channel.tier_of(&c.uid) {
                Some(tier) => Authority::Member(tier),
                None => Authority::Outsider,
            },
        };

        Self {
            hidden_at_start: channel.has(ModeFlags::HIDE_OPS),
            channel,
            source,
            env,
            authority,
            setter: source.identity(),
            seen_flags: ModeFlags::empty(),
            key_done: false,
            limit_done: false,
            unknown_reported: false,
            listed: HashSet::new(),
            errors: Vec::new(),
            lists: Vec::new(),
            diffs: DiffBuilder::new(env.limits.max_mode_params),
        }
    }

    fn fail(&mut self, err: ChannelError) {
        if self.source.is_local() && !err.is_silent() && !self.errors.contains(&err) {
            self.errors.push(err);
        }
    }

    /// Check the actor holds `tier`, reporting the failure if not.
    fn require(&mut self, tier: Tier) -> bool {
        if self.authority.at_least(tier) {
            true
        } else {
            self.fail(ChannelError::InsufficientPrivilege);
            false
        }
    }

    fn emit(&mut self, route: Route, step: ModeStep) {
        let hidden = self.channel.has(ModeFlags::HIDE_OPS);
        self.diffs
            .route(route, hidden, &self.setter, self.env.server_name, step);
    }

    fn member_mode(&mut self, letter: char, sign: Sign, param: Option<&str>) {
        let Some(nick) = param else {
            return;
        };
        if sign == Sign::Query {
            return;
        }

        let target = self.env.clients.find_by_nick(nick);
        let is_self = matches!(
            (&target, self.source.uid()),
            (Some(t), Some(me)) if t.uid == me
        );
        let needed = if letter == 'v' { Tier::HalfOp } else { Tier::ChanOp };
        if !(sign == Sign::Del && is_self) && !self.require(needed) {
            return;
        }

        let Some(target) = target else {
            self.fail(ChannelError::NoSuchNick(nick.to_string()));
            return;
        };
        let Some(current) = self.channel.tier_of(&target.uid) else {
            self.fail(ChannelError::UserNotInChannel(target.nick.clone()));
            return;
        };

        let (new_tier, shown) = match (letter, sign) {
            ('o', Sign::Add) if current != Tier::ChanOp => (Tier::ChanOp, 'o'),
            ('o', Sign::Del) if current == Tier::ChanOp => (Tier::Peon, 'o'),
            ('o', Sign::Del) if current == Tier::HalfOp => (Tier::Peon, 'h'),
            ('h', Sign::Add) if current < Tier::HalfOp => (Tier::HalfOp, 'h'),
            ('h', Sign::Del) if current == Tier::HalfOp => (Tier::Peon, 'h'),
            ('v', Sign::Add) if current < Tier::Voiced => (Tier::Voiced, 'v'),
            ('v', Sign::Del) if current == Tier::Voiced => (Tier::Peon, 'v'),
            _ => return,
        };

        self.channel.roster.change_tier(&target.uid, new_tier);
        let step = ModeStep {
            adding: sign == Sign::Add,
            letter: shown,
            param: Some(target.nick.clone()),
        };

        if self.channel.has(ModeFlags::HIDE_OPS) && !new_tier.is_privileged() {
            self.diffs.push(
                DiffGroup::Standard,
                Visibility::Member(target.uid.clone()),
                self.env.server_name,
                step.clone(),
            );
        }
        let route = if shown == 'h' { Route::HalfOp } else { Route::Member };
        self.emit(route, step);
    }

    fn key(&mut self, sign: Sign, param: Option<&str>) {
        if sign == Sign::Query || !self.require(Tier::HalfOp) || self.key_done {
            return;
        }
        let Some(param) = param else {
            return;
        };

        match sign {
            Sign::Add => {
                let key = sanitize_key(param, self.env.limits.key_len);
                if key.is_empty() || self.channel.modes.key() == Some(key.as_str()) {
                    return;
                }
                if let Some(old) = self.channel.modes.key().map(str::to_string) {
                    self.emit(
                        Route::Flag,
                        ModeStep { adding: false, letter: 'k', param: Some(old) },
                    );
                }
                self.channel.modes.set_key(&key);
                self.emit(
                    Route::Flag,
                    ModeStep { adding: true, letter: 'k', param: Some(key) },
                );
            }
            Sign::Del => {
                let Some(current) = self.channel.modes.key().map(str::to_string) else {
                    return;
                };
                if self.source.is_local() && param != "*" && param != current {
                    self.fail(ChannelError::Mismatch);
                    return;
                }
                self.channel.modes.clear_key();
                self.emit(
                    Route::Flag,
                    ModeStep { adding: false, letter: 'k', param: Some(current) },
                );
            }
            Sign::Query => return,
        }
        self.key_done = true;
    }

    fn limit(&mut self, sign: Sign, param: Option<&str>) {
        if sign == Sign::Query || !self.require(Tier::HalfOp) || self.limit_done {
            return;
        }

        match sign {
            Sign::Add => {
                let Some(param) = param else {
                    return;
                };
                let value = match param.trim().parse::<i64>() {
                    Ok(v) => v,
                    Err(_) => {
                        self.fail(ChannelError::BadParameter(param.to_string()));
                        return;
                    }
                };
                if value <= 0 {
                    return;
                }
                let value = u32::try_from(value).unwrap_or(u32::MAX);
                if self.channel.modes.limit() == Some(value) {
                    return;
                }
                self.channel.modes.set_limit(value);
                self.emit(
                    Route::Flag,
                    ModeStep { adding: true, letter: 'l', param: Some(value.to_string()) },
                );
            }
            Sign::Del => {
                if self.channel.modes.limit().is_none() {
                    return;
                }
                self.channel.modes.clear_limit();
                self.emit(Route::Flag, ModeStep { adding: false, letter: 'l', param: None });
            }
            Sign::Query => return,
        }
        self.limit_done = true;
    }

    fn list(&mut self, kind: ListKind, sign: Sign, param: Option<&str>) {
        let param = match (sign, param) {
            (Sign::Add | Sign::Del, Some(p)) => p,
            _ => {
                self.send_list(kind);
                return;
            }
        };
        if !self.require(Tier::HalfOp) {
            return;
        }

        let mask = normalize_mask(param);
        let step = match sign {
            Sign::Add => {
                let cap = self.source.is_local().then_some(self.env.limits.max_bans);
                match self
                    .channel
                    .lists
                    .add(kind, &mask, &self.setter, self.env.now, cap)
                {
                    Ok(()) => ModeStep { adding: true, letter: kind.mode_letter(), param: Some(mask) },
                    Err(err) => {
                        debug!(channel = %self.channel.name, mask = %mask, error = %err, "list add rejected");
                        self.fail(err);
                        return;
                    }
                }
            }
            _ => match self.channel.lists.remove(kind, &mask) {
                Ok(entry) => ModeStep {
                    adding: false,
                    letter: kind.mode_letter(),
                    param: Some(entry.mask),
                },
                Err(err) => {
                    self.fail(err);
                    return;
                }
            },
        };
        self.emit(Route::List(kind), step);
    }

    fn send_list(&mut self, kind: ListKind) {
        if self.listed.contains(&kind) {
            return;
        }
        let restricted = kind != ListKind::Ban && self.channel.has(ModeFlags::HIDE_OPS);
        if restricted && !self.require(Tier::HalfOp) {
            return;
        }
        self.listed.insert(kind);
        self.lists.push(ListReply {
            kind,
            entries: self.channel.lists.entries(kind).to_vec(),
        });
    }

    fn simple(&mut self, flag: ModeFlags, letter: char, sign: Sign) {
        if sign == Sign::Query {
            return;
        }
        let needed = if flag == ModeFlags::HIDE_OPS { Tier::ChanOp } else { Tier::HalfOp };
        if !self.require(needed) {
            return;
        }
        if self.source.is_local() {
            if self.seen_flags.contains(flag) {
                return;
            }
            self.seen_flags.insert(flag);
        }

        let adding = sign == Sign::Add;
        if self.channel.has(flag) == adding {
            return;
        }
        self.channel.modes.set_flags(flag, adding);
        let step = ModeStep { adding, letter, param: None };
        if flag == ModeFlags::HIDE_OPS {
            // Every member sees the toggle itself.
            self.diffs
                .push(DiffGroup::Standard, Visibility::AllMembers, &self.setter, step);
        } else {
            self.emit(Route::Flag, step);
        }
    }

    fn unknown(&mut self, letter: char) {
        if !self.unknown_reported {
            self.unknown_reported = true;
            self.fail(ChannelError::UnknownMode(letter));
        }
    }

    fn finish(mut self) -> ModeChangeOutcome {
        let now_hidden = self.channel.has(ModeFlags::HIDE_OPS);
        if now_hidden != self.hidden_at_start {
            replay_privileges(&*self.channel, self.env, now_hidden, &mut self.diffs);
        }

        ModeChangeOutcome {
            diffs: self.diffs.finish(),
            errors: self.errors,
            lists: self.lists,
        }
    }
}

/// Replay every privileged member to non-ops after hidden-ops toggled.
///
/// Turning hidden-ops on shows non-ops the privileges being taken away;
/// turning it off shows them again.
pub(super) fn replay_privileges(
    channel: &Channel,
    env: &ModeEnv<'_>,
    now_hidden: bool,
    diffs: &mut DiffBuilder,
) {
    for (uid, tier) in channel.roster.iter().filter(|(_, t)| *t != Tier::Peon) {
        let (Some(letter), Some(nick)) = (tier.mode_letter(), env.clients.nick_of(uid)) else {
            continue;
        };
        diffs.push(
            DiffGroup::Standard,
            Visibility::NonOps,
            env.server_name,
            ModeStep { adding: !now_hidden, letter, param: Some(nick) },
        );
    }
}

/// Strip characters that cannot appear in a key and truncate.
pub fn sanitize_key(raw: &str, max_len: usize) -> String {
    raw.chars()
        .filter(|c| !c.is_control() && *c != ' ' && *c != ',')
        .take(max_len)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        clients: ClientTable,
        limits: ChannelLimitsConfig,
        channel: Channel,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                clients: ClientTable::new("001"),
                limits: ChannelLimitsConfig::default(),
                channel: Channel::new("#test", 100, 100),
            }
        }

        fn join(&mut self, nick: &str, tier: Tier) -> Client {
            let uid = self.clients.register_local(nick, nick, "host.example", "10.0.0.1");
            self.channel.add_member(&uid, tier, true, 100);
            self.clients.get(&uid).unwrap()
        }

        fn mode(&mut self, source: &Source, modes: &str, params: &[&str]) -> ModeChangeOutcome {
            let env = ModeEnv {
                clients: &self.clients,
                limits: &self.limits,
                server_name: "irc.test",
                now: 200,
            };
            let params: Vec<String> = params.iter().map(|s| s.to_string()).collect();
            apply_mode_change(&mut self.channel, source, &env, &[modes.to_string()], &params)
        }
    }

    fn lines(outcome: &ModeChangeOutcome) -> Vec<String> {
        outcome.diffs.iter().map(|d| d.render().to_line()).collect()
    }

    #[test]
    fn sign_persists_across_letters() {
        let mut fx = Fixture::new();
        let op = fx.join("op", Tier::ChanOp);
        fx.join("n1", Tier::Peon);
        fx.join("n2", Tier::ChanOp);
        let out = fx.mode(&Source::Local(op), "+o-o", &["n1", "n2"]);
        assert!(out.errors.is_empty());
        assert_eq!(lines(&out), ["+o-o n1 n2"]);
        let n1 = fx.clients.find_by_nick("n1").unwrap();
        let n2 = fx.clients.find_by_nick("n2").unwrap();
        assert_eq!(fx.channel.tier_of(&n1.uid), Some(Tier::ChanOp));
        assert_eq!(fx.channel.tier_of(&n2.uid), Some(Tier::Peon));
    }

    #[test]
    fn repeated_local_flag_applies_once() {
        let mut fx = Fixture::new();
        let op = fx.join("op", Tier::ChanOp);
        let out = fx.mode(&Source::Local(op.clone()), "+i+i+i", &[]);
        assert_eq!(lines(&out), ["+i"]);
        let again = fx.mode(&Source::Local(op), "+i", &[]);
        assert!(!again.changed());
        assert!(fx.channel.has(ModeFlags::INVITE_ONLY));
    }

    #[test]
    fn halfop_cannot_op_but_can_devoice() {
        let mut fx = Fixture::new();
        let half = fx.join("half", Tier::HalfOp);
        fx.join("peon", Tier::Peon);
        fx.join("voiced", Tier::Voiced);
        let out = fx.mode(&Source::Local(half.clone()), "+o", &["peon"]);
        assert_eq!(out.errors, [ChannelError::InsufficientPrivilege]);
        assert!(!out.changed());

        let out = fx.mode(&Source::Local(half), "-v", &["voiced"]);
        assert!(out.errors.is_empty());
        assert_eq!(lines(&out), ["-v voiced"]);
    }

    #[test]
    fn deop_of_halfop_becomes_dehalfop() {
        let mut fx = Fixture::new();
        let op = fx.join("op", Tier::ChanOp);
        let half = fx.join("half", Tier::HalfOp);
        fx.join("voiced", Tier::Voiced);
        let out = fx.mode(&Source::Local(op), "-oo", &["half", "voiced"]);
        assert_eq!(lines(&out), ["-h half"]);
        assert_eq!(out.diffs[0].group, DiffGroup::HalfOps);
        assert_eq!(fx.channel.tier_of(&half.uid), Some(Tier::Peon));
        assert_eq!(fx.channel.roster.members_of(Tier::Voiced).len(), 1);
    }

    #[test]
    fn voice_on_chanop_is_noop() {
        let mut fx = Fixture::new();
        let op = fx.join("op", Tier::ChanOp);
        fx.join("other", Tier::ChanOp);
        let out = fx.mode(&Source::Local(op), "+vh", &["other", "other"]);
        assert!(!out.changed());
        assert_eq!(fx.channel.roster.op_count(), 2);
    }

    #[test]
    fn self_deop_is_always_allowed() {
        let mut fx = Fixture::new();
        let half = fx.join("half", Tier::HalfOp);
        let out = fx.mode(&Source::Local(half.clone()), "-h", &["half"]);
        assert!(out.errors.is_empty());
        assert_eq!(fx.channel.tier_of(&half.uid), Some(Tier::Peon));
    }

    #[test]
    fn unknown_targets_report_errors() {
        let mut fx = Fixture::new();
        let op = fx.join("op", Tier::ChanOp);
        fx.clients.register_local("outside", "o", "h", "ip");
        let out = fx.mode(&Source::Local(op), "+oo", &["ghost", "outside"]);
        assert_eq!(
            out.errors,
            [
                ChannelError::NoSuchNick("ghost".into()),
                ChannelError::UserNotInChannel("outside".into())
            ]
        );
    }

    #[test]
    fn key_replace_emits_removal_then_addition() {
        let mut fx = Fixture::new();
        let op = fx.join("op", Tier::ChanOp);
        fx.mode(&Source::Local(op.clone()), "+k", &["old"]);
        let out = fx.mode(&Source::Local(op.clone()), "+k", &["new key"]);
        assert_eq!(lines(&out), ["-k+k old newkey"]);
        let out = fx.mode(&Source::Local(op.clone()), "+k", &["newkey"]);
        assert!(!out.changed());
    }

    #[test]
    fn key_removal_needs_match_for_locals() {
        let mut fx = Fixture::new();
        let op = fx.join("op", Tier::ChanOp);
        fx.mode(&Source::Local(op.clone()), "+k", &["secret"]);
        let out = fx.mode(&Source::Local(op.clone()), "-k", &["wrong"]);
        assert_eq!(out.errors, [ChannelError::Mismatch]);
        assert_eq!(fx.channel.modes.key(), Some("secret"));

        let out = fx.mode(&Source::Server("hub".into()), "-k", &["whatever"]);
        assert_eq!(lines(&out), ["-k secret"]);
        assert_eq!(fx.channel.modes.key(), None);

        fx.mode(&Source::Local(op.clone()), "+k", &["again"]);
        let out = fx.mode(&Source::Local(op), "-k", &["*"]);
        assert!(out.changed());
    }

    #[test]
    fn only_one_key_change_per_request() {
        let mut fx = Fixture::new();
        let op = fx.join("op", Tier::ChanOp);
        let out = fx.mode(&Source::Local(op), "+kk", &["one", "two"]);
        assert_eq!(lines(&out), ["+k one"]);
    }

    #[test]
    fn limit_rules() {
        let mut fx = Fixture::new();
        let op = fx.join("op", Tier::ChanOp);
        let out = fx.mode(&Source::Local(op.clone()), "+l", &["abc"]);
        assert_eq!(out.errors, [ChannelError::BadParameter("abc".into())]);
        let out = fx.mode(&Source::Local(op.clone()), "+l", &["0"]);
        assert!(!out.changed() && out.errors.is_empty());
        let out = fx.mode(&Source::Local(op.clone()), "+l", &["25"]);
        assert_eq!(lines(&out), ["+l 25"]);
        let out = fx.mode(&Source::Local(op), "-l", &[]);
        assert_eq!(lines(&out), ["-l"]);
        assert_eq!(fx.channel.modes.limit(), None);
    }

    #[test]
    fn ban_masks_are_normalized_and_listed() {
        let mut fx = Fixture::new();
        let op = fx.join("op", Tier::ChanOp);
        let out = fx.mode(&Source::Local(op.clone()), "+b", &["bad.example"]);
        assert_eq!(lines(&out), ["+b *!*@bad.example"]);

        let peon = fx.join("peon", Tier::Peon);
        let out = fx.mode(&Source::Local(peon), "+b", &[]);
        assert_eq!(out.lists.len(), 1);
        assert_eq!(out.lists[0].entries[0].mask, "*!*@bad.example");
        assert_eq!(out.lists[0].entries[0].set_by, "op!op@host.example");

        let out = fx.mode(&Source::Local(op.clone()), "-b", &["*!*@bad.example"]);
        assert_eq!(lines(&out), ["-b *!*@bad.example"]);
        let out = fx.mode(&Source::Local(op), "-b", &["*!*@bad.example"]);
        assert!(!out.changed());
        assert_eq!(
            out.errors,
            [ChannelError::NoSuchListEntry("*!*@bad.example".into())]
        );
    }

    #[test]
    fn list_cap_applies_to_local_clients_only() {
        let mut fx = Fixture::new();
        fx.limits.max_bans = 1;
        let op = fx.join("op", Tier::ChanOp);
        fx.mode(&Source::Local(op.clone()), "+b", &["a!*@*"]);
        let out = fx.mode(&Source::Local(op), "+e", &["b!*@*"]);
        assert_eq!(out.errors, [ChannelError::ListFull('e')]);
        let out = fx.mode(&Source::Server("hub".into()), "+e", &["b!*@*"]);
        assert_eq!(out.diffs[0].group, DiffGroup::Exceptions);
        assert_eq!(fx.channel.lists.count(), 2);
    }

    #[test]
    fn unknown_letter_reported_once() {
        let mut fx = Fixture::new();
        let op = fx.join("op", Tier::ChanOp);
        let out = fx.mode(&Source::Local(op), "+XYn", &[]);
        assert_eq!(out.errors, [ChannelError::UnknownMode('X')]);
        assert_eq!(lines(&out), ["+n"]);
    }

    #[test]
    fn remote_errors_are_dropped_and_ts_zero_is_trusted() {
        let mut fx = Fixture::new();
        let uid = fx
            .clients
            .register_remote("002AAAAAA", "rem", "r", "h", "ip", "hub");
        fx.channel.add_member(&uid, Tier::Peon, false, 100);
        let remote = Source::Remote(fx.clients.get(&uid).unwrap());

        let out = fx.mode(&remote, "+mZ", &[]);
        assert!(out.errors.is_empty());
        assert!(!out.changed());

        fx.channel.ts = 0;
        let out = fx.mode(&remote, "+m", &[]);
        assert_eq!(lines(&out), ["+m"]);
    }

    #[test]
    fn hidden_ops_routes_privileges_to_ops() {
        let mut fx = Fixture::new();
        let op = fx.join("op", Tier::ChanOp);
        let peon = fx.join("peon", Tier::Peon);
        fx.join("voiced", Tier::Voiced);

        let out = fx.mode(&Source::Local(op.clone()), "+a", &[]);
        let resync: Vec<_> = out
            .diffs
            .iter()
            .filter(|d| d.visibility == Visibility::NonOps)
            .map(|d| d.render().to_line())
            .collect();
        assert_eq!(resync, ["-ov op voiced"]);

        let out = fx.mode(&Source::Local(op), "+v", &["peon"]);
        let privileged = out
            .diffs
            .iter()
            .find(|d| d.group == DiffGroup::Privileged)
            .unwrap();
        assert_eq!(privileged.visibility, Visibility::ChanOps);
        let sync = out
            .diffs
            .iter()
            .find(|d| d.visibility == Visibility::Member(peon.uid.clone()))
            .unwrap();
        assert_eq!(sync.setter, "irc.test");
        assert!(out.diffs.iter().all(|d| d.visibility != Visibility::AllMembers));
    }

    #[test]
    fn hidden_ops_needs_chanop() {
        let mut fx = Fixture::new();
        let half = fx.join("half", Tier::HalfOp);
        let out = fx.mode(&Source::Local(half), "+a", &[]);
        assert_eq!(out.errors, [ChannelError::InsufficientPrivilege]);
        assert!(!fx.channel.has(ModeFlags::HIDE_OPS));
    }

    #[test]
    fn query_sign_lists_and_consumes_nothing() {
        let mut fx = Fixture::new();
        let op = fx.join("op", Tier::ChanOp);
        let out = fx.mode(&Source::Local(op), "=b+o", &["op"]);
        assert_eq!(out.lists.len(), 1);
        assert!(!out.changed());
    }

    #[test]
    fn sanitize_strips_and_truncates() {
        assert_eq!(sanitize_key("a b,c\x01d", 23), "abcd");
        assert_eq!(sanitize_key("abcdef", 3), "abc");
        assert_eq!(sanitize_key(" ,", 23), "");
    }
}
