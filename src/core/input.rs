//! Operator text input: one line per turn.
//!
//! Every submitted line becomes a turn-ending text send. An empty line
//! still sends a placeholder so the remote endpoint always receives an
//! explicit turn boundary; only non-empty lines count toward the
//! session's message total. The quit sentinel (and end-of-input) ends
//! the task normally and with it the whole session.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::payload::{MediaPayload, OutboundItem, SessionStats};
use crate::core::session::TaskEnd;
use crate::errors::{RelayError, RelayResult};

/// Typing this (case-insensitive) ends the session.
pub const QUIT_SENTINEL: &str = "q";

/// Sent in place of an empty line so the turn boundary still reaches
/// the remote endpoint.
pub const EMPTY_LINE_PLACEHOLDER: &str = ".";

/// Source of operator lines; stdin in the desktop binary, scripted in
/// tests.
#[async_trait]
pub trait LineInput: Send {
    /// Next line, or `None` when input is exhausted.
    async fn next_line(&mut self) -> std::io::Result<Option<String>>;
}

/// Read operator lines and enqueue them as turn-ending text sends.
pub async fn run_text_input(
    mut lines: Box<dyn LineInput>,
    tx: mpsc::Sender<OutboundItem>,
    stats: Arc<SessionStats>,
    cancel: CancellationToken,
) -> RelayResult<TaskEnd> {
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => return Ok(TaskEnd::Ended("input")),
            line = lines.next_line() => {
                line.map_err(|e| RelayError::Capture(format!("line input failed: {e}")))?
            }
        };

        // End-of-input behaves like the quit sentinel.
        let Some(line) = line else {
            return Ok(TaskEnd::UserQuit);
        };
        if line.trim().eq_ignore_ascii_case(QUIT_SENTINEL) {
            debug!("operator requested exit");
            return Ok(TaskEnd::UserQuit);
        }

        let content = if line.trim().is_empty() {
            EMPTY_LINE_PLACEHOLDER.to_string()
        } else {
            stats.record_message();
            line
        };

        let item = OutboundItem::turn_ending(MediaPayload::text(content));
        if tx.send(item).await.is_err() {
            return Ok(TaskEnd::Ended("input"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::channel::outbound_channel;
    use std::collections::VecDeque;

    struct ScriptedLines(VecDeque<String>);

    #[async_trait]
    impl LineInput for ScriptedLines {
        async fn next_line(&mut self) -> std::io::Result<Option<String>> {
            Ok(self.0.pop_front())
        }
    }

    fn scripted(lines: &[&str]) -> Box<dyn LineInput> {
        Box::new(ScriptedLines(
            lines.iter().map(|s| s.to_string()).collect(),
        ))
    }

    #[tokio::test]
    async fn test_line_becomes_turn_ending_send() {
        let (tx, mut rx) = outbound_channel();
        let stats = Arc::new(SessionStats::new());
        let end = run_text_input(
            scripted(&["hello"]),
            tx,
            Arc::clone(&stats),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(matches!(end, TaskEnd::UserQuit)); // EOF after the line
        let item = rx.recv().await.unwrap();
        assert_eq!(item.payload, MediaPayload::text("hello"));
        assert!(item.end_of_turn);
        assert_eq!(stats.message_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_line_sends_placeholder_without_counting() {
        let (tx, mut rx) = outbound_channel();
        let stats = Arc::new(SessionStats::new());
        run_text_input(
            scripted(&[""]),
            tx,
            Arc::clone(&stats),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        let item = rx.recv().await.unwrap();
        assert_eq!(item.payload, MediaPayload::text(EMPTY_LINE_PLACEHOLDER));
        assert!(item.end_of_turn);
        assert_eq!(stats.message_count(), 0);
    }

    #[tokio::test]
    async fn test_quit_sentinel_is_case_insensitive() {
        for sentinel in ["q", "Q", " q "] {
            let (tx, mut rx) = outbound_channel();
            let stats = Arc::new(SessionStats::new());
            let end = run_text_input(
                scripted(&[sentinel]),
                tx,
                Arc::clone(&stats),
                CancellationToken::new(),
            )
            .await
            .unwrap();

            assert!(matches!(end, TaskEnd::UserQuit));
            assert!(rx.recv().await.is_none(), "quit must not send anything");
            assert_eq!(stats.message_count(), 0);
        }
    }

    #[tokio::test]
    async fn test_cancellation_ends_task() {
        struct Pending;
        #[async_trait]
        impl LineInput for Pending {
            async fn next_line(&mut self) -> std::io::Result<Option<String>> {
                std::future::pending().await
            }
        }

        let (tx, _rx) = outbound_channel();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let end = run_text_input(
            Box::new(Pending),
            tx,
            Arc::new(SessionStats::new()),
            cancel,
        )
        .await
        .unwrap();
        assert!(matches!(end, TaskEnd::Ended("input")));
    }
}
