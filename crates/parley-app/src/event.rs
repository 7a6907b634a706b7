//! Driver events and render updates.

use parley_client::{
    ChannelEvent, ChannelId, ChannelState, Conversation, Group, Message, User,
};

/// Input the driver feeds into the runtime.
#[derive(Debug, Clone)]
pub enum DriverEvent {
    /// One line typed by the user.
    Input(String),

    /// Transport callback.
    Channel {
        /// Channel the callback belongs to.
        channel: ChannelId,
        /// What happened.
        event: ChannelEvent,
    },

    /// Directory fetch for a conversation completed.
    DirectoryFetched {
        /// Channel that requested the fetch.
        channel: ChannelId,
        /// All known users.
        users: Vec<User>,
    },

    /// Roster fetch for a conversation completed.
    RosterFetched {
        /// Channel that requested the fetch.
        channel: ChannelId,
        /// Group members.
        members: Vec<User>,
    },

    /// Directory or roster fetch for a conversation failed.
    FetchFailed {
        /// Channel that requested the fetch.
        channel: ChannelId,
        /// Failure description.
        reason: String,
    },

    /// `/users` listing arrived.
    UsersListed(Vec<User>),

    /// `/groups` listing arrived.
    GroupsListed(Vec<Group>),

    /// Group creation succeeded.
    GroupCreated(Group),

    /// A listing or creation request failed.
    RequestFailed {
        /// Failure description.
        reason: String,
    },

    /// Periodic timer.
    Tick,
}

/// Something for the driver to show.
#[derive(Debug, Clone, Copy)]
pub enum Update<'a> {
    /// Active conversation or its channel state changed.
    State {
        /// Active conversation.
        conversation: Option<&'a Conversation>,
        /// Channel state.
        state: ChannelState,
    },

    /// Message log of the active conversation.
    Messages {
        /// Messages in order.
        messages: &'a [Message],
        /// Log generation; a new value means earlier messages were replaced.
        generation: u64,
    },

    /// Group membership view.
    Membership {
        /// Current members, including unconfirmed adds.
        members: &'a [User],
        /// Users that can still be added.
        addable: &'a [User],
    },

    /// User directory listing.
    Users(&'a [User]),

    /// Group listing.
    Groups(&'a [Group]),

    /// Informational text.
    Notice(&'a str),
}
