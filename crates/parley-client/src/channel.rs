//! Channel identity and lifecycle.
//!
//! A channel is one realtime duplex connection bound to one conversation. The
//! controller allocates a fresh [`ChannelId`] for every connection it opens and
//! tags everything the transport reports with it; an event whose id is not the
//! active channel's belongs to a superseded connection and is dropped.
//!
//! # Lifecycle
//!
//! ```text
//! ┌────────┐ activate ┌────────────┐ Opened ┌─────────────────┐ history ┌──────┐
//! │ Closed │─────────>│ Connecting │───────>│ AwaitingHistory │────────>│ Live │
//! └────────┘          └────────────┘        └─────────────────┘         └──────┘
//!      ^                    │ transport or auth failure (any open state)    │
//!      │                    v                                               │
//!      │              ┌─────────┐                                           │
//!      │              │ Errored │                                           │
//!      │              └─────────┘                                           │
//!      └──────────── deactivate / remote close ─────────────────────────────┘
//! ```

use std::fmt;

/// Identity of one channel handle.
///
/// Allocated monotonically by the controller and never reused, so comparing
/// ids is enough to tell a live handle from a superseded one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch{}", self.0)
    }
}

/// Session state of the active conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    /// No channel.
    #[default]
    Closed,
    /// Channel requested, transport not yet open.
    Connecting,
    /// Join sent, waiting for the history snapshot.
    AwaitingHistory,
    /// History received; sends accepted.
    Live,
    /// Transport or authentication failure. Only a new activation leaves
    /// this state.
    Errored,
}

/// Lifecycle notification from the transport for one channel.
///
/// Per channel the transport delivers exactly one `Opened` before any `Frame`,
/// and exactly one of `Closed`/`Errored` last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Connection established.
    Opened,
    /// One inbound frame, as received.
    Frame(Vec<u8>),
    /// Connection closed (by either side).
    Closed {
        /// Close reason, if any.
        reason: String,
    },
    /// Connection failed.
    Errored {
        /// Failure description.
        cause: String,
    },
}
