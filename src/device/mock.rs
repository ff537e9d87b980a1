//! Scripted device implementations for tests.
//!
//! Each mock can carry a shared drop counter so tests can assert that a
//! device handle was released exactly once per session.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;

use super::{AudioSink, AudioSource, RawFrame, VideoGrabber};
use crate::errors::DeviceError;

/// Shared counter incremented when a mock device is dropped.
#[derive(Debug, Clone, Default)]
pub struct DropCounter(Arc<AtomicUsize>);

impl DropCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Audio source that yields a fixed sequence of chunks, then times out
/// forever (as an idle microphone would).
pub struct ScriptedAudioSource {
    chunks: VecDeque<Bytes>,
    dropped: Option<DropCounter>,
}

impl ScriptedAudioSource {
    pub fn new(chunks: impl IntoIterator<Item = Bytes>) -> Self {
        Self {
            chunks: chunks.into_iter().collect(),
            dropped: None,
        }
    }

    pub fn with_drop_counter(mut self, counter: DropCounter) -> Self {
        self.dropped = Some(counter);
        self
    }
}

impl AudioSource for ScriptedAudioSource {
    fn read_chunk(&mut self, timeout: Duration) -> Result<Option<Bytes>, DeviceError> {
        match self.chunks.pop_front() {
            Some(chunk) => Ok(Some(chunk)),
            None => {
                std::thread::sleep(timeout);
                Ok(None)
            }
        }
    }
}

impl Drop for ScriptedAudioSource {
    fn drop(&mut self) {
        if let Some(counter) = &self.dropped {
            counter.bump();
        }
    }
}

/// Audio sink that records every chunk written to it.
pub struct RecordingAudioSink {
    written: Arc<Mutex<Vec<Vec<u8>>>>,
    dropped: Option<DropCounter>,
}

impl RecordingAudioSink {
    pub fn new() -> (Self, Arc<Mutex<Vec<Vec<u8>>>>) {
        let written = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                written: Arc::clone(&written),
                dropped: None,
            },
            written,
        )
    }

    pub fn with_drop_counter(mut self, counter: DropCounter) -> Self {
        self.dropped = Some(counter);
        self
    }
}

impl AudioSink for RecordingAudioSink {
    fn write(&mut self, pcm: &[u8]) -> Result<(), DeviceError> {
        self.written.lock().push(pcm.to_vec());
        Ok(())
    }
}

impl Drop for RecordingAudioSink {
    fn drop(&mut self) {
        if let Some(counter) = &self.dropped {
            counter.bump();
        }
    }
}

/// Grabber that yields a fixed sequence of frames, then reports
/// end-of-stream.
pub struct ScriptedVideoGrabber {
    frames: VecDeque<RawFrame>,
    dropped: Option<DropCounter>,
}

impl ScriptedVideoGrabber {
    pub fn new(frames: impl IntoIterator<Item = RawFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            dropped: None,
        }
    }

    pub fn with_drop_counter(mut self, counter: DropCounter) -> Self {
        self.dropped = Some(counter);
        self
    }
}

impl VideoGrabber for ScriptedVideoGrabber {
    fn grab(&mut self) -> Result<Option<RawFrame>, DeviceError> {
        Ok(self.frames.pop_front())
    }
}

impl Drop for ScriptedVideoGrabber {
    fn drop(&mut self) {
        if let Some(counter) = &self.dropped {
            counter.bump();
        }
    }
}
