//! Line-oriented terminal driver.
//!
//! Implements the [`Driver`] trait with tokio: stdin lines for input,
//! [`WsTransport`] for conversation channels and [`DirectoryClient`] for the
//! REST surface. REST calls run as spawned tasks and report back through an
//! internal queue, so no request ever blocks the event loop.

use std::{
    future::Future,
    io::{self, Write},
    time::{Duration, Instant},
};

use parley_app::{Driver, DriverEvent, Update};
use parley_client::{
    ChannelId, ClientError, Group, SharedCredentials,
    directory::{DirectoryClient, DirectoryError},
    transport::{TransportError, TransportEvent, WsTransport},
};
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, BufReader, Lines, Stdin},
    sync::mpsc,
    time::{Interval, MissedTickBehavior},
};

use crate::render::{self, Transcript};

/// How often the runtime gets a timer tick.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

const QUEUE_CAPACITY: usize = 64;

/// CLI driver errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// I/O error from stdin or stdout.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// REST error.
    #[error("directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// Logged-in account is missing from the user directory.
    #[error("user {username} is not in the directory")]
    UnknownIdentity {
        /// Account name used to log in.
        username: String,
    },
}

/// Terminal driver implementing the [`Driver`] trait.
pub struct CliDriver {
    transport: WsTransport,
    transport_events: mpsc::Receiver<TransportEvent>,
    directory: DirectoryClient<SharedCredentials>,
    results_tx: mpsc::Sender<DriverEvent>,
    results: mpsc::Receiver<DriverEvent>,
    input: Lines<BufReader<Stdin>>,
    tick: Interval,
    /// Admin of groups created from this terminal.
    username: String,
    transcript: Transcript,
}

impl CliDriver {
    /// Create a driver acting as `username`.
    ///
    /// Must be called within a tokio runtime.
    pub fn new(directory: DirectoryClient<SharedCredentials>, username: impl Into<String>) -> Self {
        let (transport_tx, transport_events) = mpsc::channel(QUEUE_CAPACITY);
        let (results_tx, results) = mpsc::channel(QUEUE_CAPACITY);

        let mut tick = tokio::time::interval(TICK_INTERVAL);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        Self {
            transport: WsTransport::new(transport_tx),
            transport_events,
            directory,
            results_tx,
            results,
            input: BufReader::new(tokio::io::stdin()).lines(),
            tick,
            username: username.into(),
            transcript: Transcript::new(),
        }
    }

    /// Run `request` in the background and queue its outcome.
    fn spawn_request<F>(&self, request: F)
    where
        F: Future<Output = DriverEvent> + Send + 'static,
    {
        let results = self.results_tx.clone();
        tokio::spawn(async move {
            let _ = results.send(request.await).await;
        });
    }

    fn print(lines: &[String]) -> Result<(), CliError> {
        let mut out = io::stdout().lock();
        for line in lines {
            writeln!(out, "{line}")?;
        }
        out.flush()?;
        Ok(())
    }
}

impl Driver for CliDriver {
    type Error = CliError;
    type Instant = Instant;

    async fn next_event(&mut self) -> Result<Option<DriverEvent>, Self::Error> {
        tokio::select! {
            biased;

            // Socket callbacks first so a burst of frames is not starved by input
            Some(TransportEvent { channel, event }) = self.transport_events.recv() => {
                Ok(Some(DriverEvent::Channel { channel, event }))
            }

            Some(result) = self.results.recv() => Ok(Some(result)),

            line = self.input.next_line() => match line? {
                Some(line) => Ok(Some(DriverEvent::Input(line))),
                None => {
                    tracing::debug!("stdin closed");
                    Ok(None)
                },
            },

            _ = self.tick.tick() => Ok(Some(DriverEvent::Tick)),
        }
    }

    fn open_channel(&mut self, channel: ChannelId, endpoint: &str) {
        self.transport.open(channel, endpoint);
    }

    async fn send_frame(&mut self, channel: ChannelId, frame: Vec<u8>) -> Result<(), Self::Error> {
        Ok(self.transport.send(channel, frame)?)
    }

    fn close_channel(&mut self, channel: ChannelId) {
        self.transport.close(channel);
    }

    fn fetch_directory(&mut self, channel: ChannelId) {
        let client = self.directory.clone();
        self.spawn_request(async move {
            match client.users().await {
                Ok(users) => DriverEvent::DirectoryFetched { channel, users },
                Err(err) => DriverEvent::FetchFailed { channel, reason: err.to_string() },
            }
        });
    }

    fn fetch_roster(&mut self, channel: ChannelId, group: Group) {
        let client = self.directory.clone();
        self.spawn_request(async move {
            match client.group_members(&group).await {
                Ok(members) => DriverEvent::RosterFetched { channel, members },
                Err(err) => DriverEvent::FetchFailed { channel, reason: err.to_string() },
            }
        });
    }

    fn list_users(&mut self) {
        let client = self.directory.clone();
        self.spawn_request(async move {
            match client.users().await {
                Ok(users) => DriverEvent::UsersListed(users),
                Err(err) => DriverEvent::RequestFailed { reason: err.to_string() },
            }
        });
    }

    fn list_groups(&mut self) {
        let client = self.directory.clone();
        self.spawn_request(async move {
            match client.groups().await {
                Ok(groups) => DriverEvent::GroupsListed(groups),
                Err(err) => DriverEvent::RequestFailed { reason: err.to_string() },
            }
        });
    }

    fn create_group(&mut self, name: &str) {
        let client = self.directory.clone();
        let name = name.to_string();
        let admin = self.username.clone();
        self.spawn_request(async move {
            match client.create_group(&name, &admin).await {
                Ok(group) => DriverEvent::GroupCreated(group),
                Err(err) => DriverEvent::RequestFailed { reason: err.to_string() },
            }
        });
    }

    fn now(&self) -> Self::Instant {
        Instant::now()
    }

    fn render(&mut self, update: Update<'_>) -> Result<(), Self::Error> {
        let lines = self.transcript.lines(update);
        Self::print(&lines)
    }

    fn report(&mut self, error: &ClientError) -> Result<(), Self::Error> {
        Self::print(&[render::report_line(error)])
    }

    fn stop(&mut self) {
        if let Some(channel) = self.transport.active_channel() {
            self.transport.close(channel);
        }
    }
}

impl Drop for CliDriver {
    fn drop(&mut self) {
        self.stop();
    }
}
