//! Core relay pipeline: payloads, queues, producers, pumps, and the
//! session coordinator.

pub mod capture;
pub mod channel;
pub mod input;
pub mod live;
pub mod payload;
pub mod pipeline;
pub mod session;

pub use channel::{OUTBOUND_CAPACITY, PlaybackQueue, outbound_channel};
pub use live::{LiveConfig, LiveSender, LiveSession, RemoteSender};
pub use payload::{
    LiveEvent, MediaPayload, OutboundItem, RECEIVE_SAMPLE_RATE, ResponseItem, SEND_SAMPLE_RATE,
    SessionStats,
};
pub use session::{
    SessionCoordinator, SessionIo, SessionOutcome, SessionReport, SessionState, TaskEnd,
};
