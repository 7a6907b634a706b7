//! Client
//!
//! Action-based session manager for Parley chat conversations. Owns the
//! active conversation's channel lifecycle, message log and group membership
//! view.
//!
//! # Architecture
//!
//! The client is Sans-IO. [`ConversationController`] receives events
//! ([`ControllerEvent`]), processes them through pure state machine logic, and
//! returns actions ([`ControllerAction`]) for the caller to execute. Sockets,
//! HTTP and clocks live with the caller.
//!
//! # Components
//!
//! - [`ConversationController`]: Active conversation and its channel
//! - [`MessageLog`]: Ordered history of the active conversation
//! - [`MembershipSync`]: Directory, roster and optimistic adds of a group
//! - [`CredentialProvider`]: Read-only token source consulted per command
//! - [`codec`]: Conversation-level command encoding
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::WsTransport`]: Websocket channels on tokio-tungstenite
//! - [`directory::DirectoryClient`]: REST accounts, directory and rosters

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod channel;
pub mod codec;
mod config;
mod controller;
mod conversation;
mod credentials;
mod error;
mod event;
mod membership;
mod store;

#[cfg(feature = "transport")]
pub mod directory;
#[cfg(feature = "transport")]
pub mod transport;

pub use channel::{ChannelEvent, ChannelId, ChannelState};
pub use config::{ClientConfig, DEFAULT_MEMBERSHIP_CONFIRMATION_TIMEOUT, DEFAULT_WS_ENDPOINT};
pub use controller::ConversationController;
pub use conversation::{ClientIdentity, Conversation, Group, User};
pub use credentials::{CredentialProvider, Credentials, SharedCredentials};
pub use error::ClientError;
pub use event::{ControllerAction, ControllerEvent};
pub use membership::{Confirmation, Directory, MembershipSync, Roster, compute_addable};
pub use parley_proto::{ChatId, GroupId, UserId};
pub use store::{Message, MessageLog};
