//! Desktop loop: local devices wired straight to a live session.
//!
//! Wires the default microphone, the selected video source, the default
//! speaker, and stdin into one [`SessionCoordinator`]. Operator-facing
//! output (greeting, prompt, model text, summary) goes to stdout;
//! everything else is tracing.

use std::io::Write;

use async_trait::async_trait;
use clap::ValueEnum;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tracing::warn;

use crate::config::ServerConfig;
use crate::core::input::LineInput;
use crate::core::live::LiveSession;
use crate::core::session::{SessionCoordinator, SessionIo, SessionOutcome, SessionReport};
use crate::device::audio::{MicrophoneSource, SpeakerSink};
use crate::device::video::{CameraGrabber, ScreenGrabber};
use crate::device::{AudioSink, AudioSource, VideoGrabber};
use crate::errors::RelayResult;

/// Video source for the desktop loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CaptureMode {
    /// Stream webcam frames
    #[default]
    Camera,
    /// Stream screen captures
    Screen,
    /// Audio and text only
    None,
}

impl std::fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureMode::Camera => write!(f, "camera"),
            CaptureMode::Screen => write!(f, "screen"),
            CaptureMode::None => write!(f, "none"),
        }
    }
}

/// Stdin adapter: prompts, then reads one line.
struct StdinLines {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinLines {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

#[async_trait]
impl LineInput for StdinLines {
    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        print!("\nmessage > ");
        std::io::stdout().flush()?;
        self.lines.next_line().await
    }
}

fn print_greeting(mode: CaptureMode) {
    println!("{}", "=".repeat(60));
    println!("PARLANCE LIVE");
    println!();
    println!("The model hears your microphone and reads your messages;");
    println!("it answers with audio in real time.");
    println!();
    println!(" 1. Wear headphones to avoid echo or feedback loops.");
    println!(" 2. Type your message after the `message > ` prompt.");
    println!(" 3. Press ENTER to send it to the model.");
    println!(" 4. Type 'q' and press ENTER to end the session.");
    println!();
    println!("Video mode: {mode}");
    println!("{}", "=".repeat(60));
    println!("\nSession starting...\n");
}

fn print_summary(report: &SessionReport) {
    println!("\n{}", "=".repeat(60));
    println!("SESSION SUMMARY");
    println!(" - Duration: {:.2} seconds", report.duration.as_secs_f64());
    println!(" - Messages sent: {}", report.message_count);
    match &report.outcome {
        SessionOutcome::UserQuit => println!("Goodbye!"),
        SessionOutcome::StreamEnded(name) => println!("Session ended ({name})."),
        SessionOutcome::Failed(e) => println!("Session failed: {e}"),
    }
    println!("{}\n", "=".repeat(60));
}

/// Run one desktop session to completion.
pub async fn run(mode: CaptureMode, config: &ServerConfig) -> RelayResult<()> {
    print_greeting(mode);

    let session = LiveSession::connect(&config.live_config()).await?;
    let (sender, events) = session.split();

    let (text_tx, mut text_rx) = mpsc::channel::<String>(32);
    let printer = tokio::spawn(async move {
        while let Some(text) = text_rx.recv().await {
            println!("\n[model] {text}");
        }
    });

    let io = SessionIo {
        microphone: Some(Box::new(|| {
            MicrophoneSource::open_default().map(|s| Box::new(s) as Box<dyn AudioSource>)
        })),
        video: match mode {
            CaptureMode::Camera => Some(Box::new(|| {
                CameraGrabber::open_default().map(|g| Box::new(g) as Box<dyn VideoGrabber>)
            })),
            CaptureMode::Screen => Some(Box::new(|| {
                ScreenGrabber::open_primary().map(|g| Box::new(g) as Box<dyn VideoGrabber>)
            })),
            CaptureMode::None => None,
        },
        speaker: Some(Box::new(|| {
            SpeakerSink::open_default().map(|s| Box::new(s) as Box<dyn AudioSink>)
        })),
        lines: Some(Box::new(StdinLines::new())),
        text_out: text_tx,
    };

    let coordinator = SessionCoordinator::new(sender, events, io);
    let report = coordinator.run().await;
    printer.abort();
    print_summary(&report);

    match report.outcome {
        SessionOutcome::Failed(e) => Err(e),
        SessionOutcome::StreamEnded(name) => {
            warn!(task = name, "session ended without an operator quit");
            Ok(())
        }
        SessionOutcome::UserQuit => Ok(()),
    }
}
