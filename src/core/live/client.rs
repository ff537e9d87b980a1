//! WebSocket client for the remote live session.
//!
//! `connect` performs the setup handshake, then hands the socket to a
//! background task. Outbound items arrive over a command channel from
//! any number of [`LiveSender`] clones; inbound frames are flattened
//! into [`LiveEvent`]s on the event channel the pipeline demuxes.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{Duration, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};

use super::config::LiveConfig;
use super::messages::{ClientFrame, ServerFrame};
use crate::core::payload::{LiveEvent, MediaPayload, OutboundItem};
use crate::errors::{RelayError, RelayResult};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Command channel capacity; sends beyond this back-pressure the pump.
const COMMAND_BUFFER: usize = 32;

/// Event channel capacity for inbound frames.
const EVENT_BUFFER: usize = 256;

/// How long to wait for the setup acknowledgement.
const SETUP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
enum SessionCommand {
    Send(OutboundItem),
    Close,
}

/// Seam between the pipeline and the remote session's send side.
#[async_trait]
pub trait RemoteSender: Send + Sync + 'static {
    /// Forward one outbound item, preserving call order.
    async fn send(&self, item: OutboundItem) -> RelayResult<()>;

    /// Close the remote session. Idempotent.
    async fn close(&self);
}

/// Cloneable handle to the session's send side.
#[derive(Clone)]
pub struct LiveSender {
    tx: mpsc::Sender<SessionCommand>,
}

#[async_trait]
impl RemoteSender for LiveSender {
    async fn send(&self, item: OutboundItem) -> RelayResult<()> {
        self.tx
            .send(SessionCommand::Send(item))
            .await
            .map_err(|_| RelayError::RemoteClosed)
    }

    async fn close(&self) {
        let _ = self.tx.send(SessionCommand::Close).await;
    }
}

/// A connected live session.
pub struct LiveSession {
    sender: LiveSender,
    events: mpsc::Receiver<LiveEvent>,
}

impl LiveSession {
    /// Open the session: connect, send setup, await the setup ack.
    pub async fn connect(config: &LiveConfig) -> RelayResult<Self> {
        let url = config.endpoint_url();
        let (ws, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| RelayError::Connect(e.to_string()))?;
        let (mut write, mut read) = ws.split();

        let setup = serde_json::to_string(&ClientFrame::setup(config))?;
        write
            .send(Message::Text(setup.into()))
            .await
            .map_err(|e| RelayError::WebSocket(e.to_string()))?;
        await_setup_complete(&mut read).await?;
        info!(model = %config.model, "live session established");

        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(session_task(write, read, cmd_rx, event_tx));

        Ok(Self {
            sender: LiveSender { tx: cmd_tx },
            events: event_rx,
        })
    }

    /// Split into the send handle and the inbound event stream.
    pub fn split(self) -> (LiveSender, mpsc::Receiver<LiveEvent>) {
        (self.sender, self.events)
    }
}

async fn await_setup_complete(read: &mut WsStream) -> RelayResult<()> {
    let deadline = tokio::time::Instant::now() + SETUP_TIMEOUT;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        let msg = timeout(remaining, read.next())
            .await
            .map_err(|_| RelayError::Connect("setup acknowledgement timed out".to_string()))?;
        match msg {
            Some(Ok(msg)) => {
                if let Some(frame) = parse_server_frame(&msg) {
                    if frame.is_setup_complete() {
                        return Ok(());
                    }
                    debug!("ignoring pre-setup frame");
                }
            }
            Some(Err(e)) => return Err(RelayError::Connect(e.to_string())),
            None => {
                return Err(RelayError::Connect(
                    "socket closed during setup".to_string(),
                ));
            }
        }
    }
}

/// Owns the socket for the session's lifetime: one select loop writing
/// commands and reading server frames.
async fn session_task(
    mut write: WsSink,
    mut read: WsStream,
    mut commands: mpsc::Receiver<SessionCommand>,
    events: mpsc::Sender<LiveEvent>,
) {
    loop {
        tokio::select! {
            cmd = commands.recv() => match cmd {
                Some(SessionCommand::Send(item)) => {
                    if let Err(e) = send_item(&mut write, item).await {
                        error!(error = %e, "live session send failed");
                        let _ = events.send(LiveEvent::Closed).await;
                        break;
                    }
                }
                Some(SessionCommand::Close) | None => {
                    debug!("closing live session");
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            },
            msg = read.next() => match msg {
                Some(Ok(Message::Close(_))) | None => {
                    info!("live session closed by remote");
                    let _ = events.send(LiveEvent::Closed).await;
                    break;
                }
                Some(Ok(msg)) => {
                    if let Some(frame) = parse_server_frame(&msg) {
                        let mut receiver_gone = false;
                        for event in frame.into_events() {
                            if events.send(event).await.is_err() {
                                receiver_gone = true;
                                break;
                            }
                        }
                        if receiver_gone {
                            let _ = write.send(Message::Close(None)).await;
                            break;
                        }
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "live session socket error");
                    let _ = events.send(LiveEvent::Closed).await;
                    break;
                }
            },
        }
    }
}

/// The endpoint serves JSON in both text and binary frames.
fn parse_server_frame(msg: &Message) -> Option<ServerFrame> {
    let parsed = match msg {
        Message::Text(text) => serde_json::from_str::<ServerFrame>(text.as_str()),
        Message::Binary(data) => serde_json::from_slice::<ServerFrame>(data.as_ref()),
        _ => return None,
    };
    match parsed {
        Ok(frame) => Some(frame),
        Err(e) => {
            warn!(error = %e, "unparseable server frame");
            None
        }
    }
}

async fn send_item(write: &mut WsSink, item: OutboundItem) -> RelayResult<()> {
    let OutboundItem {
        payload,
        end_of_turn,
    } = item;

    match payload {
        MediaPayload::Text { content } => {
            send_frame(write, &ClientFrame::text_turn(&content, end_of_turn)).await?;
        }
        MediaPayload::Audio { sample_rate, bytes } => {
            let mime = format!("audio/pcm;rate={sample_rate}");
            send_frame(write, &ClientFrame::media_chunk(mime, &bytes)).await?;
            if end_of_turn {
                send_frame(write, &ClientFrame::turn_boundary()).await?;
            }
        }
        MediaPayload::Image { mime_type, bytes } => {
            send_frame(write, &ClientFrame::media_chunk(mime_type, &bytes)).await?;
            if end_of_turn {
                send_frame(write, &ClientFrame::turn_boundary()).await?;
            }
        }
    }
    Ok(())
}

async fn send_frame(write: &mut WsSink, frame: &ClientFrame) -> RelayResult<()> {
    let json = serde_json::to_string(frame)?;
    write
        .send(Message::Text(json.into()))
        .await
        .map_err(|e| RelayError::WebSocket(e.to_string()))
}
