//! Line-oriented terminal client for Parley chat.
//!
//! Wires the generic [`parley_app::Runtime`] to stdin/stdout, a websocket
//! transport and the REST directory.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod driver;
pub mod login;
pub mod render;

pub use driver::{CliDriver, CliError};
pub use login::{Account, sign_in};
