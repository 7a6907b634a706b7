//! Integration tests for the websocket transport.
//!
//! These tests run real websocket connections against a local
//! tokio-tungstenite server.

#![cfg(feature = "transport")]

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parley_client::{
    ChannelEvent, ChannelId,
    transport::{TransportError, TransportEvent, WsTransport},
};
use tokio::{net::TcpListener, sync::mpsc, time::timeout};
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(5);

/// Start a server that greets each connection, echoes one text frame, then
/// closes.
async fn start_echo_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                ws.send(Message::Text(r#"{"chat_id":1,"history":[]}"#.to_string().into())).await.unwrap();
                if let Some(Ok(Message::Text(text))) = ws.next().await {
                    ws.send(Message::Text(text)).await.unwrap();
                }
                let _ = ws.close(None).await;
            });
        }
    });

    format!("ws://{addr}")
}

/// Start a server that accepts and then holds the connection open.
async fn start_idle_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                while let Some(Ok(_)) = ws.next().await {}
            });
        }
    });

    format!("ws://{addr}")
}

/// Start a server that accepts TCP connections but never answers the
/// websocket handshake.
async fn start_stalled_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    format!("ws://{addr}")
}

async fn next(events: &mut mpsc::Receiver<TransportEvent>) -> TransportEvent {
    timeout(WAIT, events.recv()).await.unwrap().unwrap()
}

#[tokio::test]
async fn open_send_receive_and_remote_close() {
    let endpoint = start_echo_server().await;
    let (tx, mut events) = mpsc::channel(16);
    let mut transport = WsTransport::new(tx);
    let channel = ChannelId(1);

    transport.open(channel, &endpoint);

    assert_eq!(next(&mut events).await, TransportEvent { channel, event: ChannelEvent::Opened });
    let history = next(&mut events).await;
    assert_eq!(history.event, ChannelEvent::Frame(br#"{"chat_id":1,"history":[]}"#.to_vec()));

    transport.send(channel, br#"{"action":"ping"}"#.to_vec()).unwrap();
    let echoed = next(&mut events).await;
    assert_eq!(echoed.event, ChannelEvent::Frame(br#"{"action":"ping"}"#.to_vec()));

    let terminal = next(&mut events).await;
    assert!(matches!(terminal.event, ChannelEvent::Closed { .. }));
    assert_eq!(terminal.channel, channel);
}

#[tokio::test]
async fn send_on_unknown_channel_is_not_open() {
    let (tx, _events) = mpsc::channel(16);
    let transport = WsTransport::new(tx);

    let err = transport.send(ChannelId(9), b"{}".to_vec()).unwrap_err();

    assert!(matches!(err, TransportError::NotOpen { channel: ChannelId(9) }));
}

#[tokio::test]
async fn close_twice_delivers_one_terminal_event() {
    let endpoint = start_idle_server().await;
    let (tx, mut events) = mpsc::channel(16);
    let mut transport = WsTransport::new(tx);
    let channel = ChannelId(1);

    transport.open(channel, &endpoint);
    assert_eq!(next(&mut events).await.event, ChannelEvent::Opened);

    transport.close(channel);
    transport.close(channel);

    let terminal = next(&mut events).await;
    assert!(matches!(terminal.event, ChannelEvent::Closed { .. }));
    assert!(timeout(Duration::from_millis(200), events.recv()).await.is_err());
    assert!(matches!(transport.send(channel, b"{}".to_vec()), Err(TransportError::NotOpen { .. })));
}

#[tokio::test]
async fn opening_new_channel_supersedes_previous() {
    let endpoint = start_idle_server().await;
    let (tx, mut events) = mpsc::channel(16);
    let mut transport = WsTransport::new(tx);

    transport.open(ChannelId(1), &endpoint);
    assert_eq!(next(&mut events).await.event, ChannelEvent::Opened);
    transport.open(ChannelId(2), &endpoint);

    loop {
        let event = next(&mut events).await;
        if event.channel == ChannelId(2) {
            assert_eq!(event.event, ChannelEvent::Opened);
            break;
        }
    }

    assert_eq!(transport.active_channel(), Some(ChannelId(2)));
    assert!(transport.send(ChannelId(1), b"{}".to_vec()).is_err());
    assert!(transport.send(ChannelId(2), b"{}".to_vec()).is_ok());
}

#[tokio::test]
async fn send_during_handshake_is_not_open() {
    let endpoint = start_stalled_server().await;
    let (tx, mut events) = mpsc::channel(16);
    let mut transport = WsTransport::new(tx);
    let channel = ChannelId(1);

    transport.open(channel, &endpoint);
    tokio::time::sleep(Duration::from_millis(200)).await;

    let err = transport.send(channel, b"{}".to_vec()).unwrap_err();

    assert!(matches!(err, TransportError::NotOpen { channel: ChannelId(1) }));
    assert!(events.try_recv().is_err());
    assert_eq!(transport.active_channel(), Some(channel));
}

#[tokio::test]
async fn connect_failure_reports_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (tx, mut events) = mpsc::channel(16);
    let mut transport = WsTransport::new(tx);
    transport.open(ChannelId(1), &format!("ws://{addr}"));

    let event = next(&mut events).await;
    assert!(matches!(event.event, ChannelEvent::Errored { .. }));
}
