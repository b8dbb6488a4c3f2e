//! MODE on channels.

use super::{ChannelRegistry, Effects};
use crate::error::{ChannelError, ChannelResult};
use crate::state::channel::mode_change::apply_mode_change;
use crate::state::channel::{Actor, ModeChangeOutcome, RenderedModes};
use crate::telemetry::spans;
use crate::util::irc_to_lower;
use tracing::debug;

impl ChannelRegistry {
    /// Apply a mode request.
    ///
    /// Per-letter failures are returned inside the outcome; only a missing
    /// channel or an unknown actor fail the whole call.
    pub fn set_mode(
        &self,
        name: &str,
        actor: &Actor,
        mode_tokens: &[String],
        params: &[String],
    ) -> ChannelResult<ModeChangeOutcome> {
        let source = self.resolve_source(actor)?;
        let folded = self.route(&irc_to_lower(name), source.uid());
        let _span = spans::mode(name, &source.identity()).entered();
        let now = self.now();

        let mut effects = Effects::default();
        let outcome = self
            .with_live(&folded, |chan| {
                let env = self.mode_env(now);
                let outcome = apply_mode_change(chan, &source, &env, mode_tokens, params);
                self.push_diffs(chan, outcome.diffs.clone(), &mut effects);
                outcome
            })
            .ok_or_else(|| ChannelError::ChannelNotFound(name.to_string()))?;
        self.complete(effects);

        if !outcome.errors.is_empty() {
            debug!(
                channel = %name,
                errors = ?outcome.errors.iter().map(|e| e.error_code()).collect::<Vec<_>>(),
                "mode request partly rejected"
            );
        }
        Ok(outcome)
    }

    /// Current modes as seen by `requester`. Key and limit values are only
    /// shown to members and servers.
    pub fn channel_modes(&self, name: &str, requester: &Actor) -> ChannelResult<RenderedModes> {
        let uid = match requester {
            Actor::Server(_) => None,
            Actor::Client(uid) => Some(uid.as_str()),
        };
        let folded = self.route(&irc_to_lower(name), uid);
        self.with_live(&folded, |chan| {
            let show = uid.is_none_or(|u| chan.is_member(u));
            chan.modes.render(show)
        })
        .ok_or_else(|| ChannelError::ChannelNotFound(name.to_string()))
    }
}
