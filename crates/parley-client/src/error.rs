//! Client error types.
//!
//! One enum covers both rejected operations (returned from controller calls)
//! and session diagnostics (reported through
//! [`crate::ControllerAction::Report`]). [`ClientError::is_fatal`] tells the two
//! severities apart for the presentation layer.

use parley_proto::{ProtocolError, UserId};
use thiserror::Error;

use crate::channel::{ChannelId, ChannelState};

/// Errors produced by the session core.
#[derive(Error, Debug)]
pub enum ClientError {
    /// No complete token pair available.
    #[error("authentication tokens are missing")]
    AuthMissing,

    /// Operation requires a live session.
    #[error("conversation is not live (state: {state:?})")]
    NotLive {
        /// State at the time of the call.
        state: ChannelState,
    },

    /// Message text was empty or whitespace only.
    #[error("message is empty")]
    EmptyMessage,

    /// No conversation is active.
    #[error("no active conversation")]
    NoActiveConversation,

    /// Direct conversation has no server-assigned chat id to address.
    #[error("direct chat has no chat id yet")]
    ChatNotAssigned,

    /// Membership operation on a direct conversation.
    #[error("membership changes require a group conversation")]
    NotGroupConversation,

    /// User is not in the directory.
    #[error("unknown user {user_id}")]
    UnknownUser {
        /// Requested user.
        user_id: UserId,
    },

    /// User is already in the roster.
    #[error("{user_id} is already a member")]
    AlreadyMember {
        /// Requested user.
        user_id: UserId,
    },

    /// Connection-level failure.
    #[error("transport error on {channel}: {cause}")]
    Transport {
        /// Failed channel.
        channel: ChannelId,
        /// Failure description.
        cause: String,
    },

    /// Undecodable inbound frame.
    #[error("malformed frame: {reason}")]
    MalformedFrame {
        /// Why classification failed.
        reason: String,
    },

    /// Live message arrived before the history snapshot and was dropped.
    #[error("message from {sender} arrived before history and was dropped")]
    FrameBeforeHistory {
        /// Sender of the dropped message.
        sender: String,
    },

    /// Optimistic add was never confirmed.
    #[error("add of {user_id} was not confirmed; reconciling roster")]
    MembershipConfirmationTimeout {
        /// User whose add is unconfirmed.
        user_id: UserId,
    },

    /// The server refused an add; the optimistic change was reverted.
    #[error("add of {} was rejected: {reason}", describe_user(.user_id))]
    MembershipRejected {
        /// Reverted user, when known.
        user_id: Option<UserId>,
        /// Server-provided reason.
        reason: String,
    },

    /// Directory or roster fetch failed.
    #[error("directory fetch failed: {reason}")]
    FetchFailed {
        /// Failure description.
        reason: String,
    },

    /// Command encoding failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

fn describe_user(user_id: &Option<UserId>) -> String {
    user_id.map_or_else(|| "member".to_string(), |u| u.to_string())
}

impl ClientError {
    /// Returns true if the error ends the current session attempt.
    ///
    /// Fatal errors leave the controller `Errored` (or never opened a
    /// channel); everything else is a warning and the session continues.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AuthMissing | Self::Transport { .. })
    }
}
