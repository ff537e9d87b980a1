//! CPAL-backed microphone source and speaker sink.
//!
//! Both sides bridge CPAL's callback model to the blocking trait seams
//! with a heap ring buffer: the capture callback pushes samples the
//! reader pops, the playback callback pops samples the writer pushed.
//! Ring overflow on capture drops samples at the callback (device
//! overrun is tolerated, never fatal); playback never drops, the writer
//! waits for the device to drain instead.

use std::time::{Duration, Instant};

use bytes::Bytes;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use super::{AudioSink, AudioSource};
use crate::core::payload::{RECEIVE_SAMPLE_RATE, SEND_SAMPLE_RATE};
use crate::errors::DeviceError;

/// Samples per microphone chunk handed to the pipeline.
pub const CHUNK_FRAMES: usize = 1024;

/// Ring capacity in samples (a few seconds at the session rates).
const RING_CAPACITY: usize = 48_000;

/// Poll interval while waiting on the ring buffer.
const RING_POLL: Duration = Duration::from_millis(10);

/// Symmetric i16 range for f32 conversion (avoids asymmetric clipping).
const I16_MAX_SYMMETRIC: f32 = i16::MAX as f32;

/// Microphone capture at 16 kHz mono s16le.
///
/// The CPAL stream runs for as long as this struct lives; dropping it
/// stops capture and releases the device.
pub struct MicrophoneSource {
    _stream: Stream,
    consumer: HeapCons<i16>,
    partial: Vec<i16>,
}

impl MicrophoneSource {
    /// Open the default input device.
    ///
    /// Returns [`DeviceError::NoDefaultDevice`] when the system has no
    /// input device at all; the caller degrades the source to inert in
    /// that case rather than ending the session.
    pub fn open_default() -> Result<Self, DeviceError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(DeviceError::NoDefaultDevice)?;

        let sample_format = device
            .default_input_config()
            .map_err(|e| DeviceError::Backend(e.to_string()))?
            .sample_format();

        let config = StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(SEND_SAMPLE_RATE),
            buffer_size: cpal::BufferSize::Default,
        };

        let (producer, consumer) = HeapRb::<i16>::new(RING_CAPACITY).split();
        let stream = match sample_format {
            SampleFormat::I16 => build_i16_input(&device, &config, producer)?,
            SampleFormat::F32 => build_f32_input(&device, &config, producer)?,
            format => {
                return Err(DeviceError::UnsupportedFormat(format!("{format:?}")));
            }
        };
        stream
            .play()
            .map_err(|e| DeviceError::Backend(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            consumer,
            partial: Vec::with_capacity(CHUNK_FRAMES),
        })
    }
}

fn build_i16_input(
    device: &cpal::Device,
    config: &StreamConfig,
    mut producer: HeapProd<i16>,
) -> Result<Stream, DeviceError> {
    device
        .build_input_stream(
            config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                // Non-blocking push; drops samples if the ring is full
                // (device overrun is tolerated).
                let _ = producer.push_slice(data);
            },
            |err| tracing::error!("audio input stream error: {err}"),
            None,
        )
        .map_err(|e| DeviceError::Backend(e.to_string()))
}

fn build_f32_input(
    device: &cpal::Device,
    config: &StreamConfig,
    mut producer: HeapProd<i16>,
) -> Result<Stream, DeviceError> {
    device
        .build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                for &sample in data {
                    let converted = (sample * I16_MAX_SYMMETRIC)
                        .clamp(i16::MIN as f32, i16::MAX as f32)
                        as i16;
                    let _ = producer.try_push(converted);
                }
            },
            |err| tracing::error!("audio input stream error: {err}"),
            None,
        )
        .map_err(|e| DeviceError::Backend(e.to_string()))
}

impl AudioSource for MicrophoneSource {
    fn read_chunk(&mut self, timeout: Duration) -> Result<Option<Bytes>, DeviceError> {
        let deadline = Instant::now() + timeout;
        loop {
            self.partial.extend(self.consumer.pop_iter());
            if self.partial.len() >= CHUNK_FRAMES {
                let mut bytes = Vec::with_capacity(CHUNK_FRAMES * 2);
                for sample in self.partial.drain(..CHUNK_FRAMES) {
                    bytes.extend_from_slice(&sample.to_le_bytes());
                }
                return Ok(Some(Bytes::from(bytes)));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            std::thread::sleep(RING_POLL);
        }
    }
}

/// Speaker playback at 24 kHz mono s16le.
pub struct SpeakerSink {
    _stream: Stream,
    producer: HeapProd<i16>,
}

impl SpeakerSink {
    /// Open the default output device.
    pub fn open_default() -> Result<Self, DeviceError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(DeviceError::NoDefaultOutputDevice)?;

        let sample_format = device
            .default_output_config()
            .map_err(|e| DeviceError::Backend(e.to_string()))?
            .sample_format();

        let config = StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(RECEIVE_SAMPLE_RATE),
            buffer_size: cpal::BufferSize::Default,
        };

        let (producer, consumer) = HeapRb::<i16>::new(RING_CAPACITY).split();
        let stream = match sample_format {
            SampleFormat::I16 => build_i16_output(&device, &config, consumer)?,
            SampleFormat::F32 => build_f32_output(&device, &config, consumer)?,
            format => {
                return Err(DeviceError::UnsupportedFormat(format!("{format:?}")));
            }
        };
        stream
            .play()
            .map_err(|e| DeviceError::Backend(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            producer,
        })
    }
}

fn build_i16_output(
    device: &cpal::Device,
    config: &StreamConfig,
    mut consumer: HeapCons<i16>,
) -> Result<Stream, DeviceError> {
    device
        .build_output_stream(
            config,
            move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                let filled = consumer.pop_slice(data);
                data[filled..].fill(0);
            },
            |err| tracing::error!("audio output stream error: {err}"),
            None,
        )
        .map_err(|e| DeviceError::Backend(e.to_string()))
}

fn build_f32_output(
    device: &cpal::Device,
    config: &StreamConfig,
    mut consumer: HeapCons<i16>,
) -> Result<Stream, DeviceError> {
    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                for slot in data.iter_mut() {
                    *slot = match consumer.try_pop() {
                        Some(sample) => sample as f32 / I16_MAX_SYMMETRIC,
                        None => 0.0,
                    };
                }
            },
            |err| tracing::error!("audio output stream error: {err}"),
            None,
        )
        .map_err(|e| DeviceError::Backend(e.to_string()))
}

impl AudioSink for SpeakerSink {
    fn write(&mut self, pcm: &[u8]) -> Result<(), DeviceError> {
        let samples: Vec<i16> = pcm
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        // Block only on the device draining the ring; never drop.
        let mut offset = 0;
        while offset < samples.len() {
            offset += self.producer.push_slice(&samples[offset..]);
            if offset < samples.len() {
                std::thread::sleep(RING_POLL);
            }
        }
        Ok(())
    }
}
