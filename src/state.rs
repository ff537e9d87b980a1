//! Shared application state for the relay server.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::LiveConfig;

/// Per-process state handed to every connection handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Arc<Self> {
        Arc::new(Self { config })
    }

    /// Live-session configuration derived from the server config.
    pub fn live_config(&self) -> LiveConfig {
        self.config.live_config()
    }
}
