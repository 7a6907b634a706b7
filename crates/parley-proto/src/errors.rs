//! Protocol error types.

use thiserror::Error;

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding outbound commands.
///
/// Decoding never fails: unparseable input is classified as
/// [`crate::InboundFrame::Malformed`] instead.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// JSON serialization failed
    #[error("failed to encode {action} command: {source}")]
    Encode {
        /// Wire name of the action being encoded
        action: &'static str,
        /// Underlying serializer error
        #[source]
        source: serde_json::Error,
    },
}
