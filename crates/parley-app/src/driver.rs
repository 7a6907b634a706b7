//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the runtime from specific I/O
//! implementations. Each frontend implements the trait to provide
//! platform-specific I/O, while the generic [`crate::Runtime`] handles all
//! orchestration.

use std::{future::Future, ops::Sub, time::Duration};

use parley_client::{ChannelId, ClientError, Group};

use crate::{DriverEvent, Update};

/// Abstracts I/O operations for the runtime.
///
/// Request methods (`open_channel`, `fetch_*`, `list_*`, `create_group`)
/// start work and return immediately; their outcome comes back later through
/// [`Driver::next_event`], tagged with the channel that asked for it where
/// one applies.
///
/// # Implementations
///
/// - **CLI**: tokio-tungstenite websockets, reqwest REST, stdin lines
/// - **Tests**: scripted events and recorded requests
///
/// # Associated Types
///
/// - [`Error`](Driver::Error): Platform-specific error type
/// - [`Instant`](Driver::Instant): Time representation (real or virtual)
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Time instant type. Enables virtual time in tests.
    type Instant: Copy + Ord + Send + Sync + Sub<Output = Duration>;

    /// Wait for the next event.
    ///
    /// Returns `None` once input is exhausted and the runtime should stop.
    fn next_event(&mut self)
    -> impl Future<Output = Result<Option<DriverEvent>, Self::Error>> + Send;

    /// Open `channel` to `endpoint`.
    fn open_channel(&mut self, channel: ChannelId, endpoint: &str);

    /// Write a frame to `channel`.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is not open or the write fails.
    fn send_frame(
        &mut self,
        channel: ChannelId,
        frame: Vec<u8>,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Close `channel`. A no-op for channels that are not open.
    fn close_channel(&mut self, channel: ChannelId);

    /// Fetch the user directory for `channel`.
    fn fetch_directory(&mut self, channel: ChannelId);

    /// Fetch the roster of `group` for `channel`.
    fn fetch_roster(&mut self, channel: ChannelId, group: Group);

    /// List all users.
    fn list_users(&mut self);

    /// List all groups.
    fn list_groups(&mut self);

    /// Create a group.
    fn create_group(&mut self, name: &str);

    /// Current time instant.
    fn now(&self) -> Self::Instant;

    /// Show an update.
    ///
    /// # Errors
    ///
    /// Returns an error if output fails.
    fn render(&mut self, update: Update<'_>) -> Result<(), Self::Error>;

    /// Show a diagnostic.
    ///
    /// # Errors
    ///
    /// Returns an error if output fails.
    fn report(&mut self, error: &ClientError) -> Result<(), Self::Error>;

    /// Release all connections and clean up resources.
    fn stop(&mut self);
}
