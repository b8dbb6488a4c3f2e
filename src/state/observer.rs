//! Outbound channel events.
//!
//! The registry never formats protocol lines. Every externally visible change
//! becomes a [`ChannelEvent`] handed to a [`ChannelObserver`], which the
//! broadcast and server-link layers implement. Events are collected while the
//! channel lock is held and delivered after it is released, so an observer
//! may call back into the registry.

use crate::state::Uid;
use crate::state::channel::sjoin::SjoinWinner;
use crate::state::channel::{ModeDiff, Tier, Topic};
use parking_lot::Mutex;
use tracing::debug;

/// Why a member left a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveReason {
    Part(Option<String>),
    Kick { by: String, reason: Option<String> },
    Quit(Option<String>),
}

/// A change other servers or local members need to hear about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    MemberJoined {
        channel: String,
        uid: Uid,
        tier: Tier,
    },
    MemberLeft {
        channel: String,
        uid: Uid,
        reason: LeaveReason,
    },
    ModeChanged {
        channel: String,
        diff: ModeDiff,
    },
    TopicChanged {
        channel: String,
        topic: Topic,
    },
    Invited {
        channel: String,
        uid: Uid,
        by: String,
    },
    ChannelDestroyed {
        channel: String,
    },
    SjoinConflictResolved {
        channel: String,
        winner: SjoinWinner,
        deposed: Vec<Uid>,
    },
}

impl ChannelEvent {
    /// Name of the channel the event concerns.
    pub fn channel(&self) -> &str {
        match self {
            ChannelEvent::MemberJoined { channel, .. }
            | ChannelEvent::MemberLeft { channel, .. }
            | ChannelEvent::ModeChanged { channel, .. }
            | ChannelEvent::TopicChanged { channel, .. }
            | ChannelEvent::Invited { channel, .. }
            | ChannelEvent::ChannelDestroyed { channel }
            | ChannelEvent::SjoinConflictResolved { channel, .. } => channel,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ChannelEvent::MemberJoined { .. } => "member_joined",
            ChannelEvent::MemberLeft { .. } => "member_left",
            ChannelEvent::ModeChanged { .. } => "mode_changed",
            ChannelEvent::TopicChanged { .. } => "topic_changed",
            ChannelEvent::Invited { .. } => "invited",
            ChannelEvent::ChannelDestroyed { .. } => "channel_destroyed",
            ChannelEvent::SjoinConflictResolved { .. } => "sjoin_conflict_resolved",
        }
    }
}

/// Receives channel events.
pub trait ChannelObserver: Send + Sync {
    fn on_event(&self, event: &ChannelEvent);
}

/// Observer that only logs.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl ChannelObserver for TracingObserver {
    fn on_event(&self, event: &ChannelEvent) {
        match event {
            ChannelEvent::ModeChanged { channel, diff } => {
                let rendered = diff.render();
                debug!(
                    channel = %channel,
                    group = ?diff.group,
                    visibility = ?diff.visibility,
                    setter = %diff.setter,
                    modes = %rendered.to_line(),
                    "mode changed"
                );
            }
            other => debug!(channel = %other.channel(), event = other.kind(), "channel event"),
        }
    }
}

/// Observer that records every event, for tests and audit.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<ChannelEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<ChannelEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn snapshot(&self) -> Vec<ChannelEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl ChannelObserver for EventLog {
    fn on_event(&self, event: &ChannelEvent) {
        self.events.lock().push(event.clone());
    }
}
