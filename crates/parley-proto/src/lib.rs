//! Parley session protocol.
//!
//! JSON commands and frames exchanged over a conversation-scoped realtime
//! channel. Outbound traffic is a small set of typed [`Command`]s; inbound
//! traffic is classified exactly once into an [`InboundFrame`] so callers never
//! inspect raw JSON field presence themselves.
//!
//! # Components
//!
//! - [`Command`]: Outbound command envelope (`action`, `data`, tokens)
//! - [`InboundFrame`]: Tagged union over everything the server pushes
//! - [`decode`]: Infallible inbound classifier
//! - [`Credentials`]: Bearer and CSRF token pair embedded in every command

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod command;
pub mod errors;
pub mod ids;
pub mod inbound;

pub use command::{Action, Command, CommandData, Credentials, WireOutgoingMessage};
pub use errors::{ProtocolError, Result};
pub use ids::{ChatId, GroupId, UserId};
pub use inbound::{HistoryContext, InboundFrame, MembershipEvent, WireMessage, decode};
