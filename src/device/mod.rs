//! Device seams: narrow interfaces over the microphone, speaker, and
//! frame grabbers.
//!
//! Capture and playback hardware is consumed through these traits so
//! the pipeline never touches a device API directly. Real backends live
//! in [`audio`] (CPAL) and [`video`] (nokhwa camera, xcap screen);
//! [`mock`] provides scripted implementations for tests.
//!
//! Device objects are created *inside* the blocking task thread that
//! owns them (CPAL streams are not `Send`), so the pipeline passes
//! opener closures instead of live handles.

pub mod audio;
pub mod mock;
pub mod video;

use std::time::Duration;

use bytes::Bytes;

use crate::errors::DeviceError;

/// Opens an audio input device on the calling thread.
pub type AudioSourceOpener =
    Box<dyn FnOnce() -> Result<Box<dyn AudioSource>, DeviceError> + Send + 'static>;

/// Opens an audio output device on the calling thread.
pub type AudioSinkOpener =
    Box<dyn FnOnce() -> Result<Box<dyn AudioSink>, DeviceError> + Send + 'static>;

/// Opens a camera or screen grabber on the calling thread.
pub type VideoGrabberOpener =
    Box<dyn FnOnce() -> Result<Box<dyn VideoGrabber>, DeviceError> + Send + 'static>;

/// Blocking source of fixed-size PCM chunks (16-bit LE mono).
pub trait AudioSource {
    /// Read the next chunk, waiting at most `timeout` for enough
    /// samples to accumulate.
    ///
    /// `Ok(None)` means no full chunk arrived within the timeout; the
    /// caller uses that boundary to poll for cancellation and retries.
    fn read_chunk(&mut self, timeout: Duration) -> Result<Option<Bytes>, DeviceError>;
}

/// Blocking audio output device.
pub trait AudioSink {
    /// Write one PCM chunk, blocking until the device accepts it.
    fn write(&mut self, pcm: &[u8]) -> Result<(), DeviceError>;
}

/// A single captured frame, tightly-packed RGB8.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

/// Camera or screen frame grabber.
pub trait VideoGrabber {
    /// Grab one frame. `Ok(None)` signals end-of-stream: the owning
    /// capture task stops producing and ends normally.
    fn grab(&mut self) -> Result<Option<RawFrame>, DeviceError>;
}
