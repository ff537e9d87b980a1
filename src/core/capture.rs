//! Capture producers: microphone chunks and paced video frames.
//!
//! Device loops run on blocking threads (CPAL streams are not `Send`
//! and device reads block), polling the cancellation token at every
//! timeout boundary so teardown never hangs on a device call.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::payload::{MediaPayload, OutboundItem, SEND_SAMPLE_RATE};
use crate::core::session::TaskEnd;
use crate::device::video::encode_jpeg_bounded;
use crate::device::{AudioSourceOpener, VideoGrabberOpener};
use crate::errors::{DeviceError, RelayError, RelayResult};

/// Pacing between video frame grabs.
pub const VIDEO_FRAME_INTERVAL: Duration = Duration::from_secs(1);

/// Longest edge of an outbound frame after downscaling.
pub const MAX_FRAME_EDGE: u32 = 1024;

/// Cancellation poll boundary for blocking device loops.
pub const CANCEL_POLL: Duration = Duration::from_millis(100);

/// Continuously read microphone chunks into the outbound queue.
///
/// Zero-length reads are dropped, never enqueued. A missing input
/// device degrades the source to inert (the task idles until
/// cancellation) instead of ending the session.
pub async fn run_microphone(
    opener: AudioSourceOpener,
    tx: mpsc::Sender<OutboundItem>,
    cancel: CancellationToken,
) -> RelayResult<TaskEnd> {
    let handle = tokio::task::spawn_blocking(move || -> RelayResult<TaskEnd> {
        let mut source = match opener() {
            Ok(source) => source,
            Err(DeviceError::NoDefaultDevice) => {
                warn!("no audio input device detected; microphone disabled for this session");
                while !cancel.is_cancelled() {
                    std::thread::sleep(CANCEL_POLL);
                }
                return Ok(TaskEnd::Ended("microphone"));
            }
            Err(e) => return Err(e.into()),
        };

        loop {
            if cancel.is_cancelled() {
                return Ok(TaskEnd::Ended("microphone"));
            }
            match source.read_chunk(CANCEL_POLL)? {
                Some(chunk) if chunk.is_empty() => continue,
                Some(chunk) => {
                    let item =
                        OutboundItem::realtime(MediaPayload::audio(SEND_SAMPLE_RATE, chunk));
                    if tx.blocking_send(item).is_err() {
                        return Ok(TaskEnd::Ended("microphone"));
                    }
                }
                None => continue,
            }
        }
    });

    handle
        .await
        .map_err(|e| RelayError::Capture(format!("microphone task panicked: {e}")))?
}

/// Grab, compress, and enqueue one frame roughly every second.
///
/// The grabber reporting end-of-stream ends the task normally. Queue
/// pressure blocks the producer; frames are only ever skipped when
/// capture itself fails.
pub async fn run_video(
    opener: VideoGrabberOpener,
    tx: mpsc::Sender<OutboundItem>,
    cancel: CancellationToken,
) -> RelayResult<TaskEnd> {
    let handle = tokio::task::spawn_blocking(move || -> RelayResult<TaskEnd> {
        let mut grabber = opener().map_err(RelayError::from)?;

        loop {
            if cancel.is_cancelled() {
                return Ok(TaskEnd::Ended("video"));
            }
            let frame = match grabber.grab()? {
                Some(frame) => frame,
                None => {
                    debug!("video source reported end of stream");
                    return Ok(TaskEnd::Ended("video"));
                }
            };

            let jpeg = encode_jpeg_bounded(&frame, MAX_FRAME_EDGE)?;
            let item = OutboundItem::realtime(MediaPayload::jpeg(jpeg));
            if tx.blocking_send(item).is_err() {
                return Ok(TaskEnd::Ended("video"));
            }

            // Pace the next grab, observing cancellation while waiting.
            let deadline = Instant::now() + VIDEO_FRAME_INTERVAL;
            while Instant::now() < deadline {
                if cancel.is_cancelled() {
                    return Ok(TaskEnd::Ended("video"));
                }
                std::thread::sleep(CANCEL_POLL);
            }
        }
    });

    handle
        .await
        .map_err(|e| RelayError::Capture(format!("video task panicked: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::channel::outbound_channel;
    use crate::device::mock::{ScriptedAudioSource, ScriptedVideoGrabber};
    use crate::device::{AudioSource, RawFrame, VideoGrabber};
    use bytes::Bytes;

    #[tokio::test]
    async fn test_microphone_drops_zero_length_reads() {
        let (tx, mut rx) = outbound_channel();
        let cancel = CancellationToken::new();
        let source = ScriptedAudioSource::new([Bytes::new(), Bytes::from_static(b"pcm")]);
        let opener: AudioSourceOpener =
            Box::new(move || Ok(Box::new(source) as Box<dyn AudioSource>));

        let task = tokio::spawn(run_microphone(opener, tx, cancel.clone()));

        let item = rx.recv().await.unwrap();
        assert_eq!(
            item.payload,
            MediaPayload::audio(SEND_SAMPLE_RATE, Bytes::from_static(b"pcm"))
        );
        assert!(!item.end_of_turn);

        cancel.cancel();
        assert!(matches!(
            task.await.unwrap().unwrap(),
            TaskEnd::Ended("microphone")
        ));
    }

    #[tokio::test]
    async fn test_microphone_degrades_without_device() {
        let (tx, mut rx) = outbound_channel();
        let cancel = CancellationToken::new();
        let opener: AudioSourceOpener = Box::new(|| Err(DeviceError::NoDefaultDevice));

        let task = tokio::spawn(run_microphone(opener, tx, cancel.clone()));

        // Inert: nothing produced, but the task stays alive.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!task.is_finished());

        cancel.cancel();
        assert!(task.await.unwrap().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_video_encodes_then_ends_on_eos() {
        let (tx, mut rx) = outbound_channel();
        let cancel = CancellationToken::new();
        let grabber = ScriptedVideoGrabber::new([RawFrame {
            width: 8,
            height: 8,
            rgb: vec![0x40; 8 * 8 * 3],
        }]);
        let opener: VideoGrabberOpener =
            Box::new(move || Ok(Box::new(grabber) as Box<dyn VideoGrabber>));

        let task = tokio::spawn(run_video(opener, tx, cancel));

        let item = rx.recv().await.unwrap();
        match item.payload {
            MediaPayload::Image { mime_type, bytes } => {
                assert_eq!(mime_type, "image/jpeg");
                assert_eq!(&bytes[..2], &[0xff, 0xd8]);
            }
            other => panic!("expected an image payload, got {other:?}"),
        }

        // The scripted grabber reports end-of-stream next; the task
        // ends normally after the pacing interval.
        assert!(matches!(
            task.await.unwrap().unwrap(),
            TaskEnd::Ended("video")
        ));
    }

    #[tokio::test]
    async fn test_video_open_failure_is_fatal() {
        let (tx, _rx) = outbound_channel();
        let cancel = CancellationToken::new();
        let opener: VideoGrabberOpener = Box::new(|| Err(DeviceError::Video("gone".to_string())));

        let result = run_video(opener, tx, cancel).await;
        assert!(matches!(result, Err(RelayError::Device(_))));
    }
}
