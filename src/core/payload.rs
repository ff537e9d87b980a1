//! Payload types flowing through the relay pipeline.
//!
//! Every producer wraps what it captured in a [`MediaPayload`]; the
//! outbound queue carries [`OutboundItem`]s (payload plus turn signal);
//! the remote session surfaces [`LiveEvent`]s on the inbound side.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;

/// PCM sample rate for client/microphone audio sent to the model (Hz).
pub const SEND_SAMPLE_RATE: u32 = 16_000;

/// PCM sample rate of model audio output (Hz).
pub const RECEIVE_SAMPLE_RATE: u32 = 24_000;

/// A discrete unit of media produced by one capture or input source.
///
/// Producers guarantee non-empty `bytes`/`content`: zero-length device
/// reads are dropped before an item is ever constructed.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaPayload {
    /// Raw PCM 16-bit little-endian mono audio
    Audio { sample_rate: u32, bytes: Bytes },
    /// A compressed still frame (camera or screen)
    Image {
        mime_type: &'static str,
        bytes: Bytes,
    },
    /// Operator text
    Text { content: String },
}

impl MediaPayload {
    /// Wrap a PCM chunk.
    pub fn audio(sample_rate: u32, bytes: impl Into<Bytes>) -> Self {
        Self::Audio {
            sample_rate,
            bytes: bytes.into(),
        }
    }

    /// Wrap a JPEG-encoded frame.
    pub fn jpeg(bytes: impl Into<Bytes>) -> Self {
        Self::Image {
            mime_type: "image/jpeg",
            bytes: bytes.into(),
        }
    }

    /// Wrap operator text.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    /// Whether the payload carries no data.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Audio { bytes, .. } => bytes.is_empty(),
            Self::Image { bytes, .. } => bytes.is_empty(),
            Self::Text { content } => content.is_empty(),
        }
    }
}

/// One element of the outbound queue: a payload and whether it closes
/// the client's turn.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundItem {
    pub payload: MediaPayload,
    pub end_of_turn: bool,
}

impl OutboundItem {
    /// A streaming item that does not close the turn (mic audio, frames).
    pub fn realtime(payload: MediaPayload) -> Self {
        Self {
            payload,
            end_of_turn: false,
        }
    }

    /// An item that tells the remote endpoint the client's turn is done.
    pub fn turn_ending(payload: MediaPayload) -> Self {
        Self {
            payload,
            end_of_turn: true,
        }
    }
}

/// One item from the remote response stream. Either field may be
/// present; both absent is a heartbeat and is ignored downstream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseItem {
    pub audio: Option<Bytes>,
    pub text: Option<String>,
}

/// Events surfaced by the remote live session.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    /// A response item (audio chunk or text) for the current turn
    Item(ResponseItem),
    /// The current response turn is complete (or was interrupted)
    TurnComplete,
    /// The remote session is gone; no further events will arrive
    Closed,
}

/// Per-session counters, read once at teardown for the summary.
///
/// `message_count` is incremented only by the text-input producer.
#[derive(Debug)]
pub struct SessionStats {
    started_at: Instant,
    message_count: AtomicU64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            message_count: AtomicU64::new(0),
        }
    }

    /// Record one submitted operator message.
    pub fn record_message(&self) {
        self.message_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_count(&self) -> u64 {
        self.message_count.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_emptiness() {
        assert!(MediaPayload::audio(SEND_SAMPLE_RATE, Bytes::new()).is_empty());
        assert!(!MediaPayload::audio(SEND_SAMPLE_RATE, vec![0u8; 4]).is_empty());
        assert!(MediaPayload::text("").is_empty());
        assert!(!MediaPayload::text(".").is_empty());
    }

    #[test]
    fn test_turn_signal_constructors() {
        let item = OutboundItem::realtime(MediaPayload::audio(SEND_SAMPLE_RATE, vec![1u8, 2]));
        assert!(!item.end_of_turn);

        let item = OutboundItem::turn_ending(MediaPayload::text("hello"));
        assert!(item.end_of_turn);
    }

    #[test]
    fn test_stats_count_messages() {
        let stats = SessionStats::new();
        assert_eq!(stats.message_count(), 0);
        stats.record_message();
        stats.record_message();
        assert_eq!(stats.message_count(), 2);
    }
}
