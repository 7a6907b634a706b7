//! Outbound commands.
//!
//! Every command is a JSON object of the form
//! `{"action": <name>, "data": {...}, "access_token": .., "csrf_token": ..}`.
//! The payload shape is fully determined by the [`Action`], so [`CommandData`]
//! is serialized without a variant tag and [`Command::new`] derives the action
//! from the data it wraps.
//!
//! # Invariants
//!
//! - Action Consistency: `Command::action` always equals `data.action()`.
//!   There is no constructor that accepts the two independently.
//! - Fresh Tokens: Commands own a copy of the credentials they were built
//!   with. Callers build a new command per send, so a rotated token is picked
//!   up by the next command without reconnecting.

use std::fmt;

use serde::Serialize;

use crate::{
    ChatId, GroupId, UserId,
    errors::{ProtocolError, Result},
};

/// Bearer and CSRF tokens issued by the authentication service.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    /// Bearer token authorizing the session.
    pub access_token: String,
    /// Anti-forgery token paired with the bearer token.
    pub csrf_token: String,
}

impl Credentials {
    /// Create a credential pair.
    pub fn new(access_token: impl Into<String>, csrf_token: impl Into<String>) -> Self {
        Self { access_token: access_token.into(), csrf_token: csrf_token.into() }
    }

    /// Both tokens are present and non-empty.
    pub fn is_complete(&self) -> bool {
        !self.access_token.is_empty() && !self.csrf_token.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("csrf_token", &"<redacted>")
            .finish()
    }
}

/// Wire name of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Join (or create) a direct chat with a peer.
    JoinPrivateChat,
    /// Join a group conversation.
    JoinGroupChat,
    /// Post a message to a direct chat.
    SendPrivateMessage,
    /// Post a message to a group.
    SendGroupMessage,
    /// Add a user to a group.
    AddUserToGroupChat,
}

impl Action {
    /// Wire name used in the `action` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::JoinPrivateChat => "join_private_chat",
            Self::JoinGroupChat => "join_group_chat",
            Self::SendPrivateMessage => "send_private_message",
            Self::SendGroupMessage => "send_group_message",
            Self::AddUserToGroupChat => "add_user_to_group_chat",
        }
    }
}

/// Message body carried by send commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireOutgoingMessage {
    /// Username of the author.
    pub sender_username: String,
    /// Message text.
    pub content: String,
}

/// Username reference used by the direct-chat join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRef {
    /// Username of the joining user.
    pub username: String,
}

/// Action-specific command payload.
///
/// Serialized untagged: the enclosing [`Command`] carries the action name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CommandData {
    /// `join_private_chat`
    JoinPrivate {
        /// Joining user.
        user1: UserRef,
        /// Peer the chat is with.
        user2_id: UserId,
    },
    /// `join_group_chat`
    JoinGroup {
        /// Target group.
        group_id: GroupId,
        /// Group display name (the server resolves groups by name).
        group_name: String,
        /// Joining user.
        user_name: String,
    },
    /// `send_private_message`
    SendPrivate {
        /// Chat assigned by the server in its history snapshot.
        chat_id: ChatId,
        /// Message body.
        message: WireOutgoingMessage,
    },
    /// `send_group_message`
    SendGroup {
        /// Target group.
        group_id: GroupId,
        /// Message body.
        message: WireOutgoingMessage,
    },
    /// `add_user_to_group_chat`
    AddMember {
        /// Target group.
        group_id: GroupId,
        /// User being added.
        user_id: UserId,
        /// User performing the add.
        adder_id: UserId,
    },
}

impl CommandData {
    /// Action this payload belongs to.
    pub fn action(&self) -> Action {
        match self {
            Self::JoinPrivate { .. } => Action::JoinPrivateChat,
            Self::JoinGroup { .. } => Action::JoinGroupChat,
            Self::SendPrivate { .. } => Action::SendPrivateMessage,
            Self::SendGroup { .. } => Action::SendGroupMessage,
            Self::AddMember { .. } => Action::AddUserToGroupChat,
        }
    }
}

/// Complete outbound command envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Command {
    action: Action,
    data: CommandData,
    #[serde(flatten)]
    credentials: Credentials,
}

impl Command {
    /// Wrap a payload with the credentials to authenticate it.
    pub fn new(data: CommandData, credentials: Credentials) -> Self {
        Self { action: data.action(), data, credentials }
    }

    /// Join a direct chat between `username` and `peer`.
    pub fn join_private(username: &str, peer: UserId, credentials: Credentials) -> Self {
        let data = CommandData::JoinPrivate {
            user1: UserRef { username: username.to_owned() },
            user2_id: peer,
        };
        Self::new(data, credentials)
    }

    /// Join a group as `username`.
    pub fn join_group(
        group_id: GroupId,
        group_name: &str,
        username: &str,
        credentials: Credentials,
    ) -> Self {
        let data = CommandData::JoinGroup {
            group_id,
            group_name: group_name.to_owned(),
            user_name: username.to_owned(),
        };
        Self::new(data, credentials)
    }

    /// Send `content` to a direct chat.
    pub fn send_private(
        chat_id: ChatId,
        sender: &str,
        content: &str,
        credentials: Credentials,
    ) -> Self {
        let message =
            WireOutgoingMessage { sender_username: sender.to_owned(), content: content.to_owned() };
        Self::new(CommandData::SendPrivate { chat_id, message }, credentials)
    }

    /// Send `content` to a group.
    pub fn send_group(
        group_id: GroupId,
        sender: &str,
        content: &str,
        credentials: Credentials,
    ) -> Self {
        let message =
            WireOutgoingMessage { sender_username: sender.to_owned(), content: content.to_owned() };
        Self::new(CommandData::SendGroup { group_id, message }, credentials)
    }

    /// Ask the server to add `user_id` to a group on behalf of `adder_id`.
    pub fn add_member(
        group_id: GroupId,
        user_id: UserId,
        adder_id: UserId,
        credentials: Credentials,
    ) -> Self {
        Self::new(CommandData::AddMember { group_id, user_id, adder_id }, credentials)
    }

    /// Action name of this command.
    pub fn action(&self) -> Action {
        self.action
    }

    /// Action-specific payload.
    pub fn data(&self) -> &CommandData {
        &self.data
    }

    /// Serialize to the JSON bytes sent over the channel.
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|source| ProtocolError::Encode { action: self.action.as_str(), source })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn creds() -> Credentials {
        Credentials::new("at", "ct")
    }

    fn encoded(command: &Command) -> Value {
        serde_json::from_slice(&command.encode().unwrap()).unwrap()
    }

    #[test]
    fn join_private_shape() {
        let command = Command::join_private("alice", UserId(2), creds());

        assert_eq!(
            encoded(&command),
            json!({
                "action": "join_private_chat",
                "data": { "user1": { "username": "alice" }, "user2_id": 2 },
                "access_token": "at",
                "csrf_token": "ct",
            })
        );
    }

    #[test]
    fn join_group_snapshot() {
        let command = Command::join_group(GroupId(7), "rustaceans", "alice", creds());
        let text = String::from_utf8(command.encode().unwrap()).unwrap();

        insta::assert_snapshot!(text, @r#"{"action":"join_group_chat","data":{"group_id":7,"group_name":"rustaceans","user_name":"alice"},"access_token":"at","csrf_token":"ct"}"#);
    }

    #[test]
    fn send_private_shape() {
        let command = Command::send_private(ChatId::Number(11), "alice", "hi", creds());

        assert_eq!(
            encoded(&command),
            json!({
                "action": "send_private_message",
                "data": {
                    "chat_id": 11,
                    "message": { "sender_username": "alice", "content": "hi" },
                },
                "access_token": "at",
                "csrf_token": "ct",
            })
        );
    }

    #[test]
    fn send_group_snapshot() {
        let command = Command::send_group(GroupId(3), "bob", "yo", creds());
        let text = String::from_utf8(command.encode().unwrap()).unwrap();

        insta::assert_snapshot!(text, @r#"{"action":"send_group_message","data":{"group_id":3,"message":{"sender_username":"bob","content":"yo"}},"access_token":"at","csrf_token":"ct"}"#);
    }

    #[test]
    fn add_member_shape() {
        let command = Command::add_member(GroupId(3), UserId(9), UserId(1), creds());

        assert_eq!(command.action(), Action::AddUserToGroupChat);
        assert_eq!(
            encoded(&command),
            json!({
                "action": "add_user_to_group_chat",
                "data": { "group_id": 3, "user_id": 9, "adder_id": 1 },
                "access_token": "at",
                "csrf_token": "ct",
            })
        );
    }

    #[test]
    fn action_wire_names_match_serde() {
        for action in [
            Action::JoinPrivateChat,
            Action::JoinGroupChat,
            Action::SendPrivateMessage,
            Action::SendGroupMessage,
            Action::AddUserToGroupChat,
        ] {
            assert_eq!(serde_json::to_value(action).unwrap(), json!(action.as_str()));
        }
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let debug = format!("{:?}", Credentials::new("secret-bearer", "secret-csrf"));
        assert!(!debug.contains("secret"));
    }
}
