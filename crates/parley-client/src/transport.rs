//! Websocket transport for conversation channels.
//!
//! [`WsTransport`] performs the socket I/O the controller asks for. It holds
//! at most one connection: opening a channel releases the previous one. Each
//! connection runs in its own task and reports back through a single event
//! sender, tagging every [`ChannelEvent`] with the [`ChannelId`] it belongs
//! to. A connection task always finishes with exactly one terminal event.
//!
//! Protocol logic stays in the Sans-IO [`crate::ConversationController`].

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::channel::{ChannelEvent, ChannelId};

/// Capacity of the per-connection outbound queue.
const OUTBOUND_CAPACITY: usize = 32;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Channel is not an open connection (still connecting, never opened,
    /// closed, or superseded).
    #[error("channel {channel} is not open")]
    NotOpen {
        /// Requested channel.
        channel: ChannelId,
    },

    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Stream error.
    #[error("stream error: {0}")]
    Stream(String),
}

/// Channel event tagged with its channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    /// Channel that produced the event.
    pub channel: ChannelId,
    /// What happened.
    pub event: ChannelEvent,
}

/// Handle to the open connection.
struct Connection {
    channel: ChannelId,
    outbound: mpsc::Sender<String>,
    /// Set by the connection task once the handshake completed.
    opened: Arc<AtomicBool>,
}

/// Websocket transport holding at most one connection.
pub struct WsTransport {
    events: mpsc::Sender<TransportEvent>,
    active: Option<Connection>,
}

impl WsTransport {
    /// Create a transport reporting to `events`.
    pub fn new(events: mpsc::Sender<TransportEvent>) -> Self {
        Self { events, active: None }
    }

    /// Channel of the open connection, if any.
    pub fn active_channel(&self) -> Option<ChannelId> {
        self.active.as_ref().map(|c| c.channel)
    }

    /// Connect `channel` to `endpoint`, releasing any previous connection.
    ///
    /// Must be called within a tokio runtime. Success or failure of the
    /// connect is reported asynchronously as `Opened` or `Errored`.
    pub fn open(&mut self, channel: ChannelId, endpoint: &str) {
        if let Some(previous) = self.active.take() {
            tracing::debug!(channel = %previous.channel, "releasing superseded connection");
        }

        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let opened = Arc::new(AtomicBool::new(false));
        tokio::spawn(run_connection(
            channel,
            endpoint.to_string(),
            outbound_rx,
            Arc::clone(&opened),
            self.events.clone(),
        ));

        self.active = Some(Connection { channel, outbound: outbound_tx, opened });
    }

    /// Queue `frame` for `channel`.
    ///
    /// Fails with `NotOpen` until the channel has reported `Opened`.
    pub fn send(&self, channel: ChannelId, frame: Vec<u8>) -> Result<(), TransportError> {
        let connection = self
            .active
            .as_ref()
            .filter(|c| c.channel == channel && c.opened.load(Ordering::Acquire))
            .ok_or(TransportError::NotOpen { channel })?;

        let text = String::from_utf8(frame)
            .map_err(|e| TransportError::Stream(format!("frame is not UTF-8: {e}")))?;

        connection.outbound.try_send(text).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                TransportError::Stream("outbound queue full".to_string())
            },
            mpsc::error::TrySendError::Closed(_) => TransportError::NotOpen { channel },
        })
    }

    /// Close `channel`. Closing a channel that is not open is a no-op.
    pub fn close(&mut self, channel: ChannelId) {
        if self.active_channel() == Some(channel) {
            tracing::debug!(%channel, "closing connection");
            // Dropping the outbound sender ends the connection task.
            self.active = None;
        }
    }
}

/// Run one connection and emit its terminal event.
async fn run_connection(
    channel: ChannelId,
    endpoint: String,
    mut outbound: mpsc::Receiver<String>,
    opened: Arc<AtomicBool>,
    events: mpsc::Sender<TransportEvent>,
) {
    let terminal = match drive(channel, &endpoint, &mut outbound, &opened, &events).await {
        Ok(reason) => ChannelEvent::Closed { reason },
        Err(err) => ChannelEvent::Errored { cause: err.to_string() },
    };

    tracing::debug!(%channel, ?terminal, "connection finished");
    let _ = events.send(TransportEvent { channel, event: terminal }).await;
}

/// Bridge the socket and the channels until either side closes.
///
/// Returns the close reason, or the error that ended the connection.
async fn drive(
    channel: ChannelId,
    endpoint: &str,
    outbound: &mut mpsc::Receiver<String>,
    opened: &AtomicBool,
    events: &mpsc::Sender<TransportEvent>,
) -> Result<String, TransportError> {
    let (ws_stream, _) = tokio_tungstenite::connect_async(endpoint)
        .await
        .map_err(|e| TransportError::Connection(e.to_string()))?;

    opened.store(true, Ordering::Release);
    if events.send(TransportEvent { channel, event: ChannelEvent::Opened }).await.is_err() {
        return Ok("event receiver dropped".to_string());
    }

    let (mut ws_write, mut ws_read) = ws_stream.split();

    loop {
        tokio::select! {
            frame = outbound.recv() => {
                let Some(text) = frame else {
                    let _ = ws_write.send(Message::Close(None)).await;
                    return Ok("closed by client".to_string());
                };
                ws_write
                    .send(Message::Text(text.into()))
                    .await
                    .map_err(|e| TransportError::Stream(format!("write failed: {e}")))?;
            },
            inbound = ws_read.next() => {
                let bytes = match inbound {
                    Some(Ok(Message::Text(text))) => text.as_str().as_bytes().to_vec(),
                    Some(Ok(Message::Binary(data))) => data.to_vec(),
                    Some(Ok(Message::Close(frame))) => {
                        return Ok(frame.map(|f| f.reason.to_string()).unwrap_or_default());
                    },
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(TransportError::Stream(e.to_string())),
                    None => return Ok("stream ended".to_string()),
                };

                let event = TransportEvent { channel, event: ChannelEvent::Frame(bytes) };
                if events.send(event).await.is_err() {
                    return Ok("event receiver dropped".to_string());
                }
            },
        }
    }
}
