//! Conversation identity.
//!
//! A [`Conversation`] names the chat context a session is bound to. It is
//! immutable: switching to another chat always builds a new value and a new
//! session.

use std::fmt;

use parley_proto::{GroupId, UserId};
use serde::{Deserialize, Serialize};

/// A user known to the directory.
///
/// Identity is the [`UserId`]; the username is display and wire metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    /// Server-assigned identity.
    pub id: UserId,
    /// Login name, used as the sender name on the wire.
    pub username: String,
}

impl User {
    /// Create a user.
    pub fn new(id: u64, username: impl Into<String>) -> Self {
        Self { id: UserId(id), username: username.into() }
    }
}

/// A group chat.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Group {
    /// Server-assigned identity.
    pub id: GroupId,
    /// Display name. The REST surface calls this `group_name`.
    #[serde(alias = "group_name")]
    pub name: String,
}

impl Group {
    /// Create a group.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self { id: GroupId(id), name: name.into() }
    }
}

/// Chat context of a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Conversation {
    /// One-to-one chat with a peer.
    Direct {
        /// The other participant.
        peer: User,
    },
    /// Group chat.
    Group {
        /// The group.
        group: Group,
    },
}

impl Conversation {
    /// Direct conversation with `peer`.
    pub fn direct(peer: User) -> Self {
        Self::Direct { peer }
    }

    /// Group conversation.
    pub fn group(group: Group) -> Self {
        Self::Group { group }
    }

    /// The group, for group conversations.
    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Self::Group { group } => Some(group),
            Self::Direct { .. } => None,
        }
    }
}

impl fmt::Display for Conversation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct { peer } => write!(f, "@{}", peer.username),
            Self::Group { group } => write!(f, "#{}", group.name),
        }
    }
}

/// The logged-in user this client acts as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    /// Our directory entry.
    pub user: User,
}

impl ClientIdentity {
    /// Create an identity for `user`.
    pub fn new(user: User) -> Self {
        Self { user }
    }

    /// Our user id.
    pub fn user_id(&self) -> UserId {
        self.user.id
    }

    /// Our username.
    pub fn username(&self) -> &str {
        &self.user.username
    }
}
