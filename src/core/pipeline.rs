//! Pipeline stages between the queues and the remote session: the
//! outbound pump, the inbound demux, and the playback sink.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::capture::CANCEL_POLL;
use crate::core::channel::PlaybackQueue;
use crate::core::live::RemoteSender;
use crate::core::payload::{LiveEvent, OutboundItem};
use crate::core::session::TaskEnd;
use crate::errors::{RelayError, RelayResult};

/// Drain the outbound queue into the remote session, strictly in
/// dequeue order. A slow remote send back-pressures producers through
/// the bounded queue; that is the design, not a fault.
pub async fn run_outbound_pump<S: RemoteSender>(
    mut rx: mpsc::Receiver<OutboundItem>,
    sender: S,
    cancel: CancellationToken,
) -> RelayResult<TaskEnd> {
    loop {
        let item = tokio::select! {
            _ = cancel.cancelled() => return Ok(TaskEnd::Ended("outbound pump")),
            item = rx.recv() => item,
        };
        let Some(item) = item else {
            // Every producer is gone; nothing left to forward.
            return Ok(TaskEnd::Ended("outbound pump"));
        };
        tokio::select! {
            _ = cancel.cancelled() => return Ok(TaskEnd::Ended("outbound pump")),
            sent = sender.send(item) => sent?,
        }
    }
}

/// Split the remote event stream into playback audio and display text.
///
/// Audio goes to the playback queue without ever blocking (the demux
/// must keep reading the network). Text is forwarded in arrival order.
/// A turn-complete marker atomically discards whatever audio is still
/// queued: audio for a superseded turn must never be played late.
pub async fn run_inbound_demux(
    mut events: mpsc::Receiver<LiveEvent>,
    playback: Arc<PlaybackQueue>,
    text_tx: mpsc::Sender<String>,
    cancel: CancellationToken,
) -> RelayResult<TaskEnd> {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => return Ok(TaskEnd::Ended("inbound demux")),
            event = events.recv() => event,
        };
        match event {
            Some(LiveEvent::Item(item)) => {
                if let Some(audio) = item.audio {
                    if !audio.is_empty() {
                        playback.push(audio);
                    }
                    // An item that carried audio never also emits text.
                    continue;
                }
                if let Some(text) = item.text {
                    tokio::select! {
                        _ = cancel.cancelled() => return Ok(TaskEnd::Ended("inbound demux")),
                        sent = text_tx.send(text) => {
                            if sent.is_err() {
                                return Ok(TaskEnd::Ended("inbound demux"));
                            }
                        }
                    }
                }
            }
            Some(LiveEvent::TurnComplete) => {
                let discarded = playback.drain_all();
                if discarded > 0 {
                    debug!(discarded, "discarded unplayed audio at turn boundary");
                }
            }
            Some(LiveEvent::Closed) | None => return Err(RelayError::RemoteClosed),
        }
    }
}

/// Drain the playback queue into the audio output device in arrival
/// order, blocking only on the device write.
pub async fn run_playback(
    opener: crate::device::AudioSinkOpener,
    queue: Arc<PlaybackQueue>,
    cancel: CancellationToken,
) -> RelayResult<TaskEnd> {
    let handle = tokio::task::spawn_blocking(move || -> RelayResult<TaskEnd> {
        let mut sink = opener().map_err(RelayError::from)?;
        loop {
            if cancel.is_cancelled() {
                return Ok(TaskEnd::Ended("playback"));
            }
            match queue.pop_timeout(CANCEL_POLL) {
                Some(chunk) => sink.write(&chunk).map_err(RelayError::from)?,
                None if queue.is_closed() => return Ok(TaskEnd::Ended("playback")),
                None => continue,
            }
        }
    });

    handle
        .await
        .map_err(|e| RelayError::Capture(format!("playback task panicked: {e}")))?
}
