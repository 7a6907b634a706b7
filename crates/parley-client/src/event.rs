//! Controller events and actions.

use std::time::Instant;

use parley_proto::UserId;

use crate::{
    channel::{ChannelEvent, ChannelId, ChannelState},
    conversation::{Conversation, Group, User},
    error::ClientError,
};

/// Events the caller feeds into the controller.
///
/// The caller is responsible for:
/// - Forwarding user intents (activate, send, add member)
/// - Forwarding transport callbacks tagged with their channel
/// - Forwarding directory/roster fetch completions tagged with the channel
///   that requested them
/// - Driving time forward via ticks
///
/// Generic over `I` (Instant type) to support both production
/// (`std::time::Instant`) and simulated time.
#[derive(Debug, Clone)]
pub enum ControllerEvent<I = Instant> {
    /// Switch to a conversation.
    Activate(Conversation),

    /// Leave the current conversation (navigation away, logout).
    Deactivate,

    /// Send a message to the active conversation.
    SendMessage {
        /// Message text.
        text: String,
    },

    /// Add a user to the active group.
    AddMember {
        /// User to add.
        user_id: UserId,
        /// Current time, for the confirmation window.
        now: I,
    },

    /// Refetch directory and roster for the active group.
    RefreshMembership,

    /// Transport callback.
    Channel {
        /// Channel the callback belongs to.
        channel: ChannelId,
        /// What happened.
        event: ChannelEvent,
    },

    /// Directory fetch completed.
    DirectoryFetched {
        /// Channel that requested the fetch.
        channel: ChannelId,
        /// All known users.
        users: Vec<User>,
    },

    /// Roster fetch completed.
    RosterFetched {
        /// Channel that requested the fetch.
        channel: ChannelId,
        /// Group members.
        members: Vec<User>,
    },

    /// Directory or roster fetch failed.
    FetchFailed {
        /// Channel that requested the fetch.
        channel: ChannelId,
        /// Failure description.
        reason: String,
    },

    /// Time tick for timeout processing.
    Tick {
        /// Current time.
        now: I,
    },
}

/// Actions the controller produces for the caller to execute, in order.
#[derive(Debug)]
pub enum ControllerAction {
    /// Open a channel to `endpoint`.
    OpenChannel {
        /// Identity of the new channel.
        channel: ChannelId,
        /// Websocket endpoint.
        endpoint: String,
    },

    /// Close a channel. Closing an already-closed channel is a no-op.
    CloseChannel {
        /// Channel to close.
        channel: ChannelId,
    },

    /// Write one frame to a channel.
    Send {
        /// Target channel.
        channel: ChannelId,
        /// Encoded command.
        frame: Vec<u8>,
    },

    /// Fetch the user directory; report completion tagged with `channel`.
    FetchDirectory {
        /// Requesting channel.
        channel: ChannelId,
    },

    /// Fetch a group's roster; report completion tagged with `channel`.
    FetchRoster {
        /// Requesting channel.
        channel: ChannelId,
        /// Group to fetch.
        group: Group,
    },

    /// Surface a diagnostic to the presentation layer.
    Report(ClientError),

    /// Informational text from the server.
    Notice {
        /// Server text.
        text: String,
    },

    /// Channel state changed.
    StateChanged {
        /// New state.
        state: ChannelState,
    },

    /// Message log changed.
    MessagesChanged,

    /// Roster, directory or addable view changed.
    MembershipChanged,
}
