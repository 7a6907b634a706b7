//! Inbound frame classification.
//!
//! The server pushes four kinds of frames over a conversation channel: a
//! history snapshot sent once after a join (and again on re-sync), individual
//! live messages, membership notifications, and informational notices. None of
//! them carries an explicit type tag, so [`decode`] decides the kind once from
//! the frame's structure and hands back an [`InboundFrame`]. Nothing
//! downstream looks at raw field presence.
//!
//! # Classification
//!
//! Decisions are made on object *keys*, never on string values, so a message
//! whose content reads `"history"` is still a live message.
//!
//! 1. Invalid UTF-8 is [`InboundFrame::Malformed`].
//! 2. An object with a `history` key, or with a `chat_id`/`group_id` context
//!    and no sender, is a [`InboundFrame::HistorySnapshot`]. A missing or null
//!    `history` is an empty snapshot.
//! 3. An object with an `event` key is a [`InboundFrame::MembershipEvent`].
//! 4. An object with `sender` (or `sender_username`) is a
//!    [`InboundFrame::LiveMessage`].
//! 5. An object with only a `content` string is a [`InboundFrame::Notice`].
//! 6. Plain text is a membership confirmation or rejection when it matches the
//!    server's fixed phrasing, otherwise a notice.
//!
//! Anything that matches a shape but fails its typed parse is `Malformed`;
//! there is no fallback to a different shape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{ChatId, GroupId, UserId};

/// Plain-text confirmation prefix the server uses after an add.
const JOINED_PREFIX: &str = "User ";

/// Plain-text confirmation suffix the server uses after an add.
const JOINED_SUFFIX: &str = " has joined the group!";

/// Plain-text prefix of an add rejection.
const ADD_REJECTED_PREFIX: &str = "Error adding user to group chat: ";

/// One chat message as carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    /// Username of the author.
    #[serde(alias = "sender_username")]
    pub sender: String,
    /// Message text.
    pub content: String,
    /// Server timestamp, when supplied (ISO-8601 text, carried verbatim).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl WireMessage {
    /// Message without a timestamp.
    pub fn new(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self { sender: sender.into(), content: content.into(), timestamp: None }
    }
}

/// Conversation a history snapshot belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryContext {
    /// Direct chat; the id addresses subsequent sends.
    Chat(ChatId),
    /// Group conversation.
    Group(GroupId),
    /// Snapshot without a context key.
    Unspecified,
}

/// Membership change pushed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MembershipEvent {
    /// A user joined the group.
    MemberAdded {
        /// Group the user joined. `None` for the plain-text confirmation.
        #[serde(default)]
        group_id: Option<GroupId>,
        /// User that joined.
        user_id: UserId,
    },
    /// The server refused an add.
    MemberRejected {
        /// Group of the refused add. `None` when not reported.
        #[serde(default)]
        group_id: Option<GroupId>,
        /// User that was not added. `None` when not reported.
        #[serde(default)]
        user_id: Option<UserId>,
        /// Server-provided reason.
        #[serde(default)]
        reason: String,
    },
}

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// Full message history; replaces the log wholesale.
    HistorySnapshot {
        /// Conversation the snapshot belongs to.
        context: HistoryContext,
        /// Messages in server order.
        messages: Vec<WireMessage>,
    },
    /// One message appended after the snapshot.
    LiveMessage(WireMessage),
    /// Roster change.
    MembershipEvent(MembershipEvent),
    /// Informational server text. Never part of the message log.
    Notice(String),
    /// Input that could not be classified.
    Malformed {
        /// Bytes as received.
        raw: Vec<u8>,
        /// Why classification failed.
        reason: String,
    },
}

impl InboundFrame {
    /// Short name of the frame kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::HistorySnapshot { .. } => "history",
            Self::LiveMessage(_) => "live",
            Self::MembershipEvent(_) => "membership",
            Self::Notice(_) => "notice",
            Self::Malformed { .. } => "malformed",
        }
    }
}

#[derive(Deserialize)]
struct HistoryEnvelope {
    #[serde(default)]
    chat_id: Option<ChatId>,
    #[serde(default)]
    group_id: Option<GroupId>,
    #[serde(default)]
    history: Option<Vec<WireMessage>>,
}

/// Classify raw bytes received on a channel.
///
/// Never fails and never panics; see the module docs for the rules.
pub fn decode(bytes: &[u8]) -> InboundFrame {
    let Ok(text) = std::str::from_utf8(bytes) else {
        return malformed(bytes, "frame is not valid UTF-8");
    };

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(fields)) => classify_object(bytes, fields),
        Ok(other) => malformed(bytes, format!("expected a JSON object, got {}", json_kind(&other))),
        Err(_) => classify_text(bytes, text),
    }
}

fn classify_object(raw: &[u8], fields: Map<String, Value>) -> InboundFrame {
    let has_sender = fields.contains_key("sender") || fields.contains_key("sender_username");
    let has_context = fields.contains_key("chat_id") || fields.contains_key("group_id");

    if fields.contains_key("history") || (has_context && !has_sender) {
        return match serde_json::from_value::<HistoryEnvelope>(Value::Object(fields)) {
            Ok(envelope) => {
                let context = match (envelope.chat_id, envelope.group_id) {
                    (Some(chat_id), _) => HistoryContext::Chat(chat_id),
                    (None, Some(group_id)) => HistoryContext::Group(group_id),
                    (None, None) => HistoryContext::Unspecified,
                };
                InboundFrame::HistorySnapshot {
                    context,
                    messages: envelope.history.unwrap_or_default(),
                }
            },
            Err(e) => malformed(raw, format!("invalid history frame: {e}")),
        };
    }

    if fields.contains_key("event") {
        return match serde_json::from_value::<MembershipEvent>(Value::Object(fields)) {
            Ok(event) => InboundFrame::MembershipEvent(event),
            Err(e) => malformed(raw, format!("invalid membership event: {e}")),
        };
    }

    if has_sender {
        return match serde_json::from_value::<WireMessage>(Value::Object(fields)) {
            Ok(message) => InboundFrame::LiveMessage(message),
            Err(e) => malformed(raw, format!("invalid message frame: {e}")),
        };
    }

    match fields.get("content").and_then(Value::as_str) {
        Some(content) => InboundFrame::Notice(content.to_owned()),
        None => malformed(raw, "unrecognized frame shape"),
    }
}

fn classify_text(raw: &[u8], text: &str) -> InboundFrame {
    let text = text.trim();

    if let Some(rest) = text.strip_prefix(JOINED_PREFIX)
        && let Some(id) = rest.strip_suffix(JOINED_SUFFIX)
        && let Ok(id) = id.trim().parse::<u64>()
    {
        return InboundFrame::MembershipEvent(MembershipEvent::MemberAdded {
            group_id: None,
            user_id: UserId(id),
        });
    }

    if let Some(reason) = text.strip_prefix(ADD_REJECTED_PREFIX) {
        return InboundFrame::MembershipEvent(MembershipEvent::MemberRejected {
            group_id: None,
            user_id: None,
            reason: reason.to_owned(),
        });
    }

    if text.is_empty() {
        return malformed(raw, "empty frame");
    }

    InboundFrame::Notice(text.to_owned())
}

fn malformed(raw: &[u8], reason: impl Into<String>) -> InboundFrame {
    InboundFrame::Malformed { raw: raw.to_vec(), reason: reason.into() }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
