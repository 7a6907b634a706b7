//! Server-assigned identifiers.
//!
//! User and group identifiers are integers allocated by the chat server. They
//! are newtypes so a user id can never be passed where a group id is expected.
//! Chat ids are echoed back exactly as the server sent them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a user in the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

/// Identity of a group conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u64);

/// Identity of a direct (1:1) chat, assigned by the server on join.
///
/// Serializes in the same JSON type it was received in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatId {
    /// Integer id.
    Number(u64),
    /// String id.
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user#{}", self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group#{}", self.0)
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(id) => write!(f, "chat#{id}"),
            Self::Text(id) => write!(f, "chat#{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_id_keeps_its_json_type() {
        let number: ChatId = serde_json::from_str("4").unwrap();
        let text: ChatId = serde_json::from_str(r#""c1""#).unwrap();

        assert_eq!(number, ChatId::Number(4));
        assert_eq!(text, ChatId::Text("c1".into()));
        assert_eq!(serde_json::to_string(&number).unwrap(), "4");
        assert_eq!(serde_json::to_string(&text).unwrap(), r#""c1""#);
    }
}
