//! WebSocket request handlers.

pub mod relay;

pub use relay::relay_handler;
