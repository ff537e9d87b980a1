//! Error types for the relay.
//!
//! Split into two layers: [`DeviceError`] for the capture/playback device
//! seams, and [`RelayError`] for everything that can end a session. Per-item
//! anomalies (zero-length reads, ring overflow) are absorbed where they
//! occur and never surface as errors.

use thiserror::Error;

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

/// Errors that tear a session down (or prevent one from starting).
#[derive(Debug, Error)]
pub enum RelayError {
    /// A required configuration value is absent at startup
    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),

    /// A configuration value is present but unusable
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Connecting to the remote live endpoint failed
    #[error("connection failed: {0}")]
    Connect(String),

    /// WebSocket transport error
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// Wire message (de)serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The remote session closed while the pipeline still needed it
    #[error("remote session closed unexpectedly")]
    RemoteClosed,

    /// A pipeline channel closed while a producer still needed it
    #[error("pipeline channel closed")]
    ChannelClosed,

    /// A capture or playback device failed mid-session
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    /// A capture task failed for a non-device reason
    #[error("capture error: {0}")]
    Capture(String),
}

/// Errors from the device seams (microphone, speaker, frame grabbers).
#[derive(Debug, Error)]
pub enum DeviceError {
    /// No default input device is configured on this system.
    ///
    /// This one is special-cased by the microphone producer: it degrades
    /// the source to inert instead of ending the session.
    #[error("no default input device configured")]
    NoDefaultDevice,

    /// No default output device is configured on this system
    #[error("no default output device configured")]
    NoDefaultOutputDevice,

    /// The device exists but cannot be used
    #[error("device unavailable: {0}")]
    Unavailable(String),

    /// The device's sample format is not supported
    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// An error from the underlying audio library (CPAL)
    #[error("audio backend error: {0}")]
    Backend(String),

    /// An error from the camera or screen capture backend
    #[error("video backend error: {0}")]
    Video(String),

    /// Frame encoding failed
    #[error("image encoding error: {0}")]
    Encode(String),
}
