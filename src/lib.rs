pub mod config;
pub mod core;
pub mod device;
pub mod errors;
pub mod handlers;
pub mod local;
pub mod routes;
pub mod state;

// Re-export commonly used items for convenience
pub use crate::config::ServerConfig;
pub use crate::core::*;
pub use crate::errors::{DeviceError, RelayError, RelayResult};
pub use crate::state::AppState;
