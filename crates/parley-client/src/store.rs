//! Per-conversation message log.
//!
//! The log is the client's view of one conversation's history: wholesale
//! replaced by each history snapshot and appended to by each live message. It
//! never reorders; `position` is simply the insertion index.
//!
//! The log has a single owner (the controller) and is mutated only through
//! `&mut self`, so frames are applied strictly one at a time in arrival order.

use parley_proto::WireMessage;

/// One message in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Username of the author.
    pub sender: String,
    /// Message text.
    pub content: String,
    /// Zero-based position in the log.
    pub position: u64,
    /// Server timestamp, when supplied.
    pub timestamp: Option<String>,
}

impl Message {
    fn from_wire(wire: WireMessage, position: u64) -> Self {
        Self { sender: wire.sender, content: wire.content, position, timestamp: wire.timestamp }
    }
}

/// Ordered message log of the active conversation.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
    /// Number of snapshots applied since the log was last cleared.
    generation: u64,
}

impl MessageLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap the whole log for a history snapshot.
    pub fn replace(&mut self, messages: impl IntoIterator<Item = WireMessage>) {
        self.messages = messages
            .into_iter()
            .enumerate()
            .map(|(i, wire)| Message::from_wire(wire, i as u64))
            .collect();
        self.generation += 1;
    }

    /// Append one live message.
    pub fn append(&mut self, message: WireMessage) {
        let position = self.messages.len() as u64;
        self.messages.push(Message::from_wire(message, position));
    }

    /// Drop everything (conversation change).
    pub fn clear(&mut self) {
        self.messages.clear();
        self.generation = 0;
    }

    /// Read-only ordered view.
    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Log has no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Snapshots applied since the last clear. Changes whenever the log is
    /// replaced rather than appended to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// A history snapshot has been applied since the last clear.
    pub fn has_history(&self) -> bool {
        self.generation > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(sender: &str, content: &str) -> WireMessage {
        WireMessage::new(sender, content)
    }

    fn pairs(log: &MessageLog) -> Vec<(&str, &str)> {
        log.snapshot().iter().map(|m| (m.sender.as_str(), m.content.as_str())).collect()
    }

    #[test]
    fn replace_then_append_preserves_order() {
        let mut log = MessageLog::new();
        log.replace(vec![wire("alice", "hi"), wire("bob", "hey")]);
        log.append(wire("carol", "yo"));

        assert_eq!(pairs(&log), vec![("alice", "hi"), ("bob", "hey"), ("carol", "yo")]);
        let positions: Vec<u64> = log.snapshot().iter().map(|m| m.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn second_replace_discards_previous_snapshot_and_appends() {
        let mut log = MessageLog::new();
        log.replace(vec![wire("alice", "old")]);
        log.append(wire("bob", "live"));
        log.replace(vec![wire("carol", "new")]);

        assert_eq!(pairs(&log), vec![("carol", "new")]);
        assert_eq!(log.snapshot()[0].position, 0);
    }

    #[test]
    fn clear_forgets_history() {
        let mut log = MessageLog::new();
        assert!(!log.has_history());

        log.replace(Vec::new());
        assert!(log.has_history());
        assert!(log.is_empty());

        log.append(wire("a", "b"));
        log.clear();
        assert!(!log.has_history());
        assert_eq!(log.len(), 0);
    }
}
