//! Text rendering of runtime updates.
//!
//! [`Transcript`] turns each [`Update`] into the lines to print. It remembers
//! how much of the message log is already on screen so appends print only the
//! new messages, while a replaced log is printed again in full.

use parley_app::Update;
use parley_client::{ChannelState, ClientError, Group, Message, User};

/// Incremental transcript printer state.
#[derive(Debug, Default)]
pub struct Transcript {
    generation: u64,
    printed: usize,
}

impl Transcript {
    /// Empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines to print for `update`.
    pub fn lines(&mut self, update: Update<'_>) -> Vec<String> {
        match update {
            Update::State { conversation, state } => {
                if matches!(state, ChannelState::Connecting | ChannelState::Closed) {
                    self.generation = 0;
                    self.printed = 0;
                }
                let target = conversation
                    .map_or_else(|| "no conversation".to_string(), ToString::to_string);
                vec![format!("-- {target}: {} --", describe(state))]
            },
            Update::Messages { messages, generation } => self.messages(messages, generation),
            Update::Membership { members, addable } => vec![
                format!("members: {}", names(members)),
                format!("addable: {}", names(addable)),
            ],
            Update::Users(users) => vec![format!("users: {}", names(users))],
            Update::Groups(groups) => vec![format!("groups: {}", group_names(groups))],
            Update::Notice(text) => text.lines().map(|line| format!("* {line}")).collect(),
        }
    }

    fn messages(&mut self, messages: &[Message], generation: u64) -> Vec<String> {
        let from = if generation == self.generation { self.printed.min(messages.len()) } else { 0 };
        self.generation = generation;
        self.printed = messages.len();

        messages[from..].iter().map(|m| format!("[{}] {}", m.sender, m.content)).collect()
    }
}

/// Line for a diagnostic.
pub fn report_line(error: &ClientError) -> String {
    if error.is_fatal() { format!("!! {error}") } else { format!("! {error}") }
}

fn describe(state: ChannelState) -> &'static str {
    match state {
        ChannelState::Closed => "closed",
        ChannelState::Connecting => "connecting",
        ChannelState::AwaitingHistory => "joining",
        ChannelState::Live => "live",
        ChannelState::Errored => "failed",
    }
}

fn names(users: &[User]) -> String {
    if users.is_empty() {
        return "(none)".to_string();
    }
    users.iter().map(|u| u.username.as_str()).collect::<Vec<_>>().join(", ")
}

fn group_names(groups: &[Group]) -> String {
    if groups.is_empty() {
        return "(none)".to_string();
    }
    groups.iter().map(|g| format!("#{}", g.name)).collect::<Vec<_>>().join(", ")
}
