//! TOPIC and message accounting.

use super::{ChannelRegistry, Effects};
use crate::error::{ChannelError, ChannelResult};
use crate::state::channel::mode_change::Source;
use crate::state::channel::{Actor, ModeFlags, Topic};
use crate::state::observer::ChannelEvent;
use crate::util::irc_to_lower;

impl ChannelRegistry {
    /// Read the topic. Non-members cannot see it on `+s` or `+p` channels.
    pub fn topic_get(&self, name: &str, uid: &str) -> ChannelResult<Option<Topic>> {
        let folded = self.route(&irc_to_lower(name), Some(uid));
        self.with_live(&folded, |chan| {
            let hidden = chan.has(ModeFlags::SECRET) || chan.has(ModeFlags::PRIVATE);
            if hidden && !chan.is_member(uid) {
                return Err(ChannelError::NotAMember);
            }
            Ok(chan.topic.clone())
        })
        .unwrap_or_else(|| Err(ChannelError::ChannelNotFound(name.to_string())))
    }

    /// Set or clear (empty text) the topic.
    ///
    /// Clients must be members; on `+t` channels they need half-op or
    /// better. Text is cut to the configured topic length.
    pub fn topic_set(&self, name: &str, actor: &Actor, text: &str) -> ChannelResult<Topic> {
        let source = self.resolve_source(actor)?;
        let folded = self.route(&irc_to_lower(name), source.uid());
        let now = self.now();
        let max_len = self.config.channels.topic_len;

        let mut effects = Effects::default();
        let result = self
            .with_live(&folded, |chan| {
                if let Source::Local(client) | Source::Remote(client) = &source {
                    let trusted = !client.is_local() && chan.ts == 0;
                    let tier = chan.tier_of(&client.uid);
                    match tier {
                        None if !trusted => return Err(ChannelError::NotAMember),
                        Some(t) if chan.has(ModeFlags::TOPIC_LIMIT) && !t.is_privileged() && !trusted => {
                            return Err(ChannelError::InsufficientPrivilege);
                        }
                        _ => {}
                    }
                }

                let topic = Topic {
                    text: text.chars().take(max_len).collect(),
                    set_by: source.identity(),
                    set_at: now,
                };
                chan.topic = (!topic.text.is_empty()).then(|| topic.clone());
                effects.events.push(ChannelEvent::TopicChanged {
                    channel: chan.name.clone(),
                    topic: topic.clone(),
                });
                Ok(topic)
            })
            .unwrap_or_else(|| Err(ChannelError::ChannelNotFound(name.to_string())));
        self.complete(effects);
        result
    }

    /// Count a message sent to the channel for the anti-flood layer.
    pub fn note_message(&self, name: &str, uid: &str) -> ChannelResult<()> {
        let folded = self.route(&irc_to_lower(name), Some(uid));
        let now = self.now();
        self.with_live(&folded, |chan| chan.note_message(now))
            .ok_or_else(|| ChannelError::ChannelNotFound(name.to_string()))
    }
}
