//! Remote live session: configuration, wire messages, and the
//! WebSocket client.

pub mod client;
pub mod config;
pub mod messages;

pub use client::{LiveSender, LiveSession, RemoteSender};
pub use config::{DEFAULT_MODEL, DEFAULT_SYSTEM_INSTRUCTION, LiveConfig};
