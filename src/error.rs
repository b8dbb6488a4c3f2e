//! Unified error handling for the channel state engine.
//!
//! Every failure here is local and recoverable: it is reported back to the
//! caller of a single operation, which decides whether the originating client
//! gets a protocol error reply. Nothing in this module is fatal to the process.

use thiserror::Error;

// ============================================================================
// Channel Errors
// ============================================================================

/// Channel operation errors.
///
/// Whole-operation failures (e.g. a rejected JOIN) are returned as `Err`.
/// Per-letter failures inside one MODE request are collected into the mode
/// outcome instead, so that one bad letter never aborts the rest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("not on channel")]
    NotAMember,

    #[error("you're not channel operator")]
    InsufficientPrivilege,

    #[error("already on channel")]
    AlreadyMember,

    #[error("already on a sub-channel of {0}")]
    AlreadyOnSubchan(String),

    #[error("no such channel: {0}")]
    ChannelNotFound(String),

    #[error("illegal channel name: {0}")]
    BadChannelName(String),

    #[error("channel list is full ({0})")]
    ListFull(char),

    #[error("mask already present")]
    Duplicate,

    #[error("no such list entry: {0}")]
    NoSuchListEntry(String),

    #[error("bad mode parameter: {0}")]
    BadParameter(String),

    #[error("key mismatch")]
    Mismatch,

    #[error("no such nick: {0}")]
    NoSuchNick(String),

    #[error("user {0} is not on that channel")]
    UserNotInChannel(String),

    #[error("unknown mode char {0}")]
    UnknownMode(char),

    #[error("cannot join channel (+b)")]
    Banned,

    #[error("cannot join channel (+i)")]
    InviteOnly,

    #[error("cannot join channel (+k)")]
    BadKey,

    #[error("cannot join channel (+l)")]
    ChannelFull,

    #[error("too many channels")]
    TooManyChannels,

    #[error("too many sub-channels of {0}")]
    VchanLimit(String),

    #[error("session invalid")]
    SessionInvalid,
}

impl ChannelError {
    /// Get a static error code string for log and metric labels.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotAMember => "not_a_member",
            Self::InsufficientPrivilege => "insufficient_privilege",
            Self::AlreadyMember => "already_member",
            Self::AlreadyOnSubchan(_) => "already_on_subchan",
            Self::ChannelNotFound(_) => "channel_not_found",
            Self::BadChannelName(_) => "bad_channel_name",
            Self::ListFull(_) => "list_full",
            Self::Duplicate => "duplicate",
            Self::NoSuchListEntry(_) => "no_such_list_entry",
            Self::BadParameter(_) => "bad_parameter",
            Self::Mismatch => "mismatch",
            Self::NoSuchNick(_) => "no_such_nick",
            Self::UserNotInChannel(_) => "user_not_in_channel",
            Self::UnknownMode(_) => "unknown_mode",
            Self::Banned => "banned",
            Self::InviteOnly => "invite_only",
            Self::BadKey => "bad_key",
            Self::ChannelFull => "channel_full",
            Self::TooManyChannels => "too_many_channels",
            Self::VchanLimit(_) => "vchan_limit",
            Self::SessionInvalid => "session_invalid",
        }
    }

    /// Whether the error should never be surfaced to the client.
    ///
    /// Duplicate masks are dropped silently.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::Duplicate)
    }
}

/// Result type for channel operations.
pub type ChannelResult<T> = Result<T, ChannelError>;
