//! Session supervision.
//!
//! The coordinator owns the remote session handles, spawns every
//! pipeline task, waits for the first one to finish (success, quit, or
//! failure), then cancels the rest and waits for their exit before
//! declaring the session closed. No task is ever respawned; a new
//! session needs a fresh coordinator.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::capture::{run_microphone, run_video};
use crate::core::channel::{PlaybackQueue, outbound_channel};
use crate::core::input::{LineInput, run_text_input};
use crate::core::live::RemoteSender;
use crate::core::payload::{LiveEvent, SessionStats};
use crate::core::pipeline::{run_inbound_demux, run_outbound_pump, run_playback};
use crate::device::{AudioSinkOpener, AudioSourceOpener, VideoGrabberOpener};
use crate::errors::RelayError;

/// How long draining siblings may take before they are aborted.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Session lifecycle. States are never re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Active,
    Draining,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::Active => write!(f, "active"),
            SessionState::Draining => write!(f, "draining"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

/// How a single pipeline task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEnd {
    /// The operator asked to quit; not an error
    UserQuit,
    /// The named task ran out of work or observed cancellation
    Ended(&'static str),
}

/// Why the session ended.
#[derive(Debug)]
pub enum SessionOutcome {
    UserQuit,
    StreamEnded(&'static str),
    Failed(RelayError),
}

/// Final session summary, rendered for the operator on every exit path.
#[derive(Debug)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    pub duration: Duration,
    pub message_count: u64,
}

/// The I/O endpoints a session wires together. Absent sources are
/// simply not spawned.
pub struct SessionIo {
    pub microphone: Option<AudioSourceOpener>,
    pub video: Option<VideoGrabberOpener>,
    pub speaker: Option<AudioSinkOpener>,
    pub lines: Option<Box<dyn LineInput>>,
    /// Sink for model text output (display adapter)
    pub text_out: mpsc::Sender<String>,
}

/// Supervises one session from spawn to closed.
pub struct SessionCoordinator<S: RemoteSender + Clone> {
    sender: S,
    events: mpsc::Receiver<LiveEvent>,
    io: SessionIo,
    stats: Arc<SessionStats>,
    state: SessionState,
}

impl<S: RemoteSender + Clone> SessionCoordinator<S> {
    /// Build a coordinator around an already-connected remote session.
    pub fn new(sender: S, events: mpsc::Receiver<LiveEvent>, io: SessionIo) -> Self {
        Self {
            sender,
            events,
            io,
            stats: Arc::new(SessionStats::new()),
            state: SessionState::Connecting,
        }
    }

    /// Shared statistics handle (incremented by the input task).
    pub fn stats(&self) -> Arc<SessionStats> {
        Arc::clone(&self.stats)
    }

    /// Run the session to completion. Consumes the coordinator; states
    /// are not re-enterable.
    pub async fn run(mut self) -> SessionReport {
        let cancel = CancellationToken::new();
        let (out_tx, out_rx) = outbound_channel();
        let playback = Arc::new(PlaybackQueue::new());
        let mut tasks: JoinSet<Result<TaskEnd, RelayError>> = JoinSet::new();

        tasks.spawn(run_outbound_pump(
            out_rx,
            self.sender.clone(),
            cancel.clone(),
        ));
        tasks.spawn(run_inbound_demux(
            self.events,
            Arc::clone(&playback),
            self.io.text_out,
            cancel.clone(),
        ));
        if let Some(opener) = self.io.microphone {
            tasks.spawn(run_microphone(opener, out_tx.clone(), cancel.clone()));
        }
        if let Some(opener) = self.io.video {
            tasks.spawn(run_video(opener, out_tx.clone(), cancel.clone()));
        }
        if let Some(opener) = self.io.speaker {
            tasks.spawn(run_playback(opener, Arc::clone(&playback), cancel.clone()));
        }
        if let Some(lines) = self.io.lines {
            tasks.spawn(run_text_input(
                lines,
                out_tx.clone(),
                Arc::clone(&self.stats),
                cancel.clone(),
            ));
        }
        // The pump must see the channel close once all producers exit.
        drop(out_tx);

        self.state = SessionState::Active;
        info!(state = %self.state, "session running");

        // First task to finish decides the outcome.
        let outcome = match tasks.join_next().await {
            Some(Ok(Ok(TaskEnd::UserQuit))) => SessionOutcome::UserQuit,
            Some(Ok(Ok(TaskEnd::Ended(name)))) => SessionOutcome::StreamEnded(name),
            Some(Ok(Err(e))) => SessionOutcome::Failed(e),
            Some(Err(join_err)) => {
                SessionOutcome::Failed(RelayError::Capture(format!("task panicked: {join_err}")))
            }
            None => SessionOutcome::StreamEnded("empty pipeline"),
        };

        self.state = SessionState::Draining;
        info!(state = %self.state, outcome = ?outcome, "tearing down session");
        cancel.cancel();
        playback.close();
        self.sender.close().await;

        let drain = async {
            while let Some(result) = tasks.join_next().await {
                match result {
                    Ok(Ok(end)) => debug!(?end, "sibling task drained"),
                    Ok(Err(e)) => debug!(error = %e, "sibling task ended during drain"),
                    Err(e) => warn!(error = %e, "sibling task join failed during drain"),
                }
            }
        };
        if tokio::time::timeout(DRAIN_TIMEOUT, drain).await.is_err() {
            warn!("session tasks did not drain in time; aborting the rest");
            tasks.abort_all();
            while tasks.join_next().await.is_some() {}
        }

        self.state = SessionState::Closed;
        info!(state = %self.state, "session closed");

        SessionReport {
            outcome,
            duration: self.stats.elapsed(),
            message_count: self.stats.message_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::Connecting.to_string(), "connecting");
        assert_eq!(SessionState::Active.to_string(), "active");
        assert_eq!(SessionState::Draining.to_string(), "draining");
        assert_eq!(SessionState::Closed.to_string(), "closed");
    }
}
