//! Application layer for Parley
//!
//! Command parsing and a generic runtime that drives the Sans-IO
//! [`parley_client::ConversationController`], so the same orchestration code
//! runs in the terminal client and in scripted tests.
//!
//! # Components
//!
//! - [`UserCommand`]: Parsed line of user input
//! - [`Driver`]: Trait for platform-specific I/O abstraction
//! - [`Runtime`]: Generic orchestration loop using Driver

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod command;
mod driver;
mod event;
mod runtime;

pub use command::{CommandError, HELP, UserCommand};
pub use driver::Driver;
pub use event::{DriverEvent, Update};
pub use runtime::{Flow, Runtime, RuntimeError};
