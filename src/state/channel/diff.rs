//! Mode-change diffs, split by who may see them.
//!
//! One mode request (or one SJOIN) can produce changes that different
//! audiences must see differently: with hidden-ops active, plain members
//! must not learn who holds ops, exceptions are only shown to ops, and peers
//! that predate half-ops need those grants rewritten at the link boundary.
//! The builder keeps one open batch per audience and flushes a batch as soon
//! as it carries `max_mode_params` parameters.

use super::lists::ListKind;
use super::modes::{ModeStep, RenderedModes};
use crate::state::Uid;
use std::collections::BTreeMap;

/// Broadcast class of a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiffGroup {
    /// Ordinary modes and bans, shown to every member.
    Standard,
    /// Op, voice and ban changes while hidden-ops is active.
    Privileged,
    /// `+e`/`-e`, ops only.
    Exceptions,
    /// `+I`/`-I`, ops only.
    InviteExceptions,
    /// `+h`/`-h`.
    HalfOps,
}

/// Peer capability a link must advertise to receive a group verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkCapability {
    Exceptions,
    InviteExceptions,
    HalfOps,
}

impl DiffGroup {
    /// Capability a server link needs for this group, if any.
    ///
    /// Links without the half-op capability receive half-op grants as full
    /// op grants; links without the list capabilities receive nothing.
    pub fn link_capability(self) -> Option<LinkCapability> {
        match self {
            DiffGroup::Standard | DiffGroup::Privileged => None,
            DiffGroup::Exceptions => Some(LinkCapability::Exceptions),
            DiffGroup::InviteExceptions => Some(LinkCapability::InviteExceptions),
            DiffGroup::HalfOps => Some(LinkCapability::HalfOps),
        }
    }
}

/// Which local members receive a diff.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Visibility {
    AllMembers,
    /// Chanops and half-ops.
    ChanOps,
    /// Voiced members and peons.
    NonOps,
    /// A single member.
    Member(Uid),
}

/// One broadcastable batch of mode changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeDiff {
    pub group: DiffGroup,
    pub visibility: Visibility,
    /// Display identity the change is attributed to.
    pub setter: String,
    pub steps: Vec<ModeStep>,
}

impl ModeDiff {
    /// Render as a compact mode string, e.g. `+oo-v` with its parameters.
    pub fn render(&self) -> RenderedModes {
        let mut letters = String::new();
        let mut params = Vec::new();
        let mut sign = None;

        for step in &self.steps {
            if sign != Some(step.adding) {
                letters.push(if step.adding { '+' } else { '-' });
                sign = Some(step.adding);
            }
            letters.push(step.letter);
            if let Some(p) = &step.param {
                params.push(p.clone());
            }
        }

        RenderedModes { letters, params }
    }

    pub fn param_count(&self) -> usize {
        self.steps.iter().filter(|s| s.param.is_some()).count()
    }
}

/// What kind of change a step is, for audience routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Route {
    Flag,
    /// `+o`/`+v` and their removals.
    Member,
    HalfOp,
    List(ListKind),
}

type BatchKey = (DiffGroup, Visibility, String);

/// Accumulates mode steps into per-audience batches.
#[derive(Debug)]
pub struct DiffBuilder {
    cap: usize,
    open: BTreeMap<BatchKey, (Vec<ModeStep>, usize)>,
    flushed: Vec<ModeDiff>,
}

impl DiffBuilder {
    /// `max_params` is the per-batch parameter cap (at least one).
    pub fn new(max_params: usize) -> Self {
        Self {
            cap: max_params.max(1),
            open: BTreeMap::new(),
            flushed: Vec::new(),
        }
    }

    /// Append a step to the batch for `(group, visibility, setter)`.
    pub fn push(&mut self, group: DiffGroup, visibility: Visibility, setter: &str, step: ModeStep) {
        let key = (group, visibility, setter.to_string());
        let has_param = step.param.is_some();
        let (steps, params) = self.open.entry(key.clone()).or_default();
        steps.push(step);
        if has_param {
            *params += 1;
        }
        if *params >= self.cap {
            self.flush(key);
        }
    }

    /// Push `step` to every audience that should see it.
    ///
    /// While hidden-ops is on, privilege and ban changes go to ops under the
    /// real setter; non-ops see bans and flags attributed to `masked`.
    pub(crate) fn route(
        &mut self,
        route: Route,
        hidden: bool,
        real: &str,
        masked: &str,
        step: ModeStep,
    ) {
        match (route, hidden) {
            (Route::List(ListKind::Exception), _) => {
                self.push(DiffGroup::Exceptions, Visibility::ChanOps, real, step)
            }
            (Route::List(ListKind::InviteException), _) => {
                self.push(DiffGroup::InviteExceptions, Visibility::ChanOps, real, step)
            }
            (Route::HalfOp, true) => self.push(DiffGroup::HalfOps, Visibility::ChanOps, real, step),
            (Route::HalfOp, false) => {
                self.push(DiffGroup::HalfOps, Visibility::AllMembers, real, step)
            }
            (Route::Member, true) => {
                self.push(DiffGroup::Privileged, Visibility::ChanOps, real, step)
            }
            (Route::List(ListKind::Ban), true) => {
                self.push(DiffGroup::Privileged, Visibility::ChanOps, real, step.clone());
                self.push(DiffGroup::Standard, Visibility::NonOps, masked, step);
            }
            (Route::Flag, true) => {
                self.push(DiffGroup::Standard, Visibility::ChanOps, real, step.clone());
                self.push(DiffGroup::Standard, Visibility::NonOps, masked, step);
            }
            (Route::Flag | Route::Member | Route::List(ListKind::Ban), false) => {
                self.push(DiffGroup::Standard, Visibility::AllMembers, real, step)
            }
        }
    }

    fn flush(&mut self, key: BatchKey) {
        if let Some((steps, _)) = self.open.remove(&key) {
            let (group, visibility, setter) = key;
            self.flushed.push(ModeDiff {
                group,
                visibility,
                setter,
                steps,
            });
        }
    }

    /// Flush every open batch and return all diffs in emission order.
    pub fn finish(mut self) -> Vec<ModeDiff> {
        let open = std::mem::take(&mut self.open);
        for ((group, visibility, setter), (steps, _)) in open {
            if !steps.is_empty() {
                self.flushed.push(ModeDiff {
                    group,
                    visibility,
                    setter,
                    steps,
                });
            }
        }
        self.flushed
    }
}
