//! Client configuration.

use std::time::Duration;

/// Default websocket endpoint of the chat server.
pub const DEFAULT_WS_ENDPOINT: &str = "ws://localhost:8008/ws";

/// How long an optimistic add may stay unconfirmed before the roster is
/// reconciled.
pub const DEFAULT_MEMBERSHIP_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Session core configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Websocket endpoint every conversation channel connects to.
    pub ws_endpoint: String,
    /// Confirmation window for optimistic membership changes.
    pub membership_confirmation_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ws_endpoint: DEFAULT_WS_ENDPOINT.to_string(),
            membership_confirmation_timeout: DEFAULT_MEMBERSHIP_CONFIRMATION_TIMEOUT,
        }
    }
}
