//! Browser relay WebSocket handler.
//!
//! Per accepted connection: acknowledge readiness, open one live
//! session, then bridge frames in both directions with two independent
//! tasks. The connection-level session ends as soon as either direction
//! ends (first-completion-wins); the other task is cancelled and the
//! live session closed.
//!
//! # Wire protocol
//!
//! Client -> server:
//! - text `"TEXT:<utf8>"` - one turn-ending text send
//! - text `"ACK:<anything>"` - logged, otherwise ignored
//! - binary - raw 16 kHz PCM chunk, sent turn-ending (empty frames
//!   dropped)
//!
//! Server -> client:
//! - text `"ACK:SERVER_READY"` once, before the live session exists
//! - text `"TEXT:<utf8>"` for model text output
//! - binary `b"AUDIO:" + pcm` for model audio output (24 kHz)

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use bytes::{Bytes, BytesMut};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::core::live::{LiveSender, LiveSession, RemoteSender};
use crate::core::payload::{LiveEvent, MediaPayload, OutboundItem, SEND_SAMPLE_RATE};
use crate::state::AppState;

/// Sent to the client immediately after accept, before the remote
/// session is established.
pub const SERVER_READY_ACK: &str = "ACK:SERVER_READY";

const TEXT_PREFIX: &str = "TEXT:";
const ACK_PREFIX: &str = "ACK:";
const AUDIO_PREFIX: &[u8] = b"AUDIO:";

/// A parsed client text frame.
#[derive(Debug, PartialEq)]
enum ClientTextFrame<'a> {
    Text(&'a str),
    Ack(&'a str),
    Unknown(&'a str),
}

fn parse_client_text(raw: &str) -> ClientTextFrame<'_> {
    if let Some(text) = raw.strip_prefix(TEXT_PREFIX) {
        ClientTextFrame::Text(text.trim())
    } else if let Some(ack) = raw.strip_prefix(ACK_PREFIX) {
        ClientTextFrame::Ack(ack)
    } else {
        ClientTextFrame::Unknown(raw)
    }
}

/// Map a binary client frame to an outbound audio item. Zero-length
/// frames produce no send.
fn binary_to_item(data: Bytes) -> Option<OutboundItem> {
    if data.is_empty() {
        return None;
    }
    Some(OutboundItem::turn_ending(MediaPayload::audio(
        SEND_SAMPLE_RATE,
        data,
    )))
}

/// Frame one model audio chunk for the client.
fn encode_audio_frame(audio: &[u8]) -> Bytes {
    let mut frame = BytesMut::with_capacity(AUDIO_PREFIX.len() + audio.len());
    frame.extend_from_slice(AUDIO_PREFIX);
    frame.extend_from_slice(audio);
    frame.freeze()
}

/// WebSocket upgrade for the relay endpoint.
pub async fn relay_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    info!("relay WebSocket connection upgrade requested");
    ws.on_upgrade(move |socket| handle_relay_socket(socket, state))
}

async fn handle_relay_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id = uuid::Uuid::new_v4();
    info!(%session_id, "relay WebSocket connection established");
    let (mut sender, receiver) = socket.split();

    // The client waits for this before streaming anything.
    if sender
        .send(Message::Text(SERVER_READY_ACK.into()))
        .await
        .is_err()
    {
        warn!("client went away before the ready ack");
        return;
    }

    let session = match LiveSession::connect(&state.live_config()).await {
        Ok(session) => session,
        Err(e) => {
            error!(%session_id, error = %e, "failed to open live session for relay connection");
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };
    let (live_tx, live_events) = session.split();

    let mut from_client = tokio::spawn(from_client_task(receiver, live_tx.clone()));
    let mut from_remote = tokio::spawn(from_remote_task(live_events, sender));

    // First direction to finish ends the connection-level session.
    tokio::select! {
        _ = &mut from_client => from_remote.abort(),
        _ = &mut from_remote => from_client.abort(),
    }
    live_tx.close().await;
    info!(%session_id, "relay WebSocket connection terminated");
}

/// Forward client frames into the live session.
async fn from_client_task(mut receiver: SplitStream<WebSocket>, live: LiveSender) {
    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                warn!(error = %e, "relay WebSocket receive error");
                break;
            }
        };
        match msg {
            Message::Text(raw) => match parse_client_text(raw.as_str()) {
                ClientTextFrame::Text(text) => {
                    debug!(len = text.len(), "client text turn");
                    let item = OutboundItem::turn_ending(MediaPayload::text(text));
                    if live.send(item).await.is_err() {
                        break;
                    }
                }
                ClientTextFrame::Ack(ack) => debug!(ack, "client ack"),
                ClientTextFrame::Unknown(raw) => warn!(frame = raw, "unknown client text frame"),
            },
            Message::Binary(data) => {
                debug!(len = data.len(), "client audio chunk");
                let Some(item) = binary_to_item(data) else {
                    continue;
                };
                if live.send(item).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => {
                info!("relay client disconnected");
                break;
            }
            // axum answers pings itself
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
}

/// Forward live-session events to the client.
async fn from_remote_task(
    mut events: mpsc::Receiver<LiveEvent>,
    mut sender: SplitSink<WebSocket, Message>,
) {
    while let Some(event) = events.recv().await {
        match event {
            LiveEvent::Item(item) => {
                if let Some(audio) = item.audio {
                    if audio.is_empty() {
                        continue;
                    }
                    if sender
                        .send(Message::Binary(encode_audio_frame(&audio)))
                        .await
                        .is_err()
                    {
                        break;
                    }
                    continue;
                }
                if let Some(text) = item.text {
                    if sender
                        .send(Message::Text(format!("{TEXT_PREFIX}{text}").into()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            }
            // The browser client manages its own playback buffer; turn
            // boundaries are not forwarded on this surface.
            LiveEvent::TurnComplete => {}
            LiveEvent::Closed => {
                info!("live session closed; ending relay connection");
                break;
            }
        }
    }
    let _ = sender.send(Message::Close(None)).await;
}
