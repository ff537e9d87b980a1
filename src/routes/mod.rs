//! Router assembly for the relay server.
//!
//! # Endpoint
//!
//! `GET /ws` - WebSocket upgrade for one relay session
//!
//! After the upgrade the server sends `ACK:SERVER_READY`, then bridges
//! the connection to a fresh live session (see
//! [`crate::handlers::relay`] for the frame protocol).

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::relay::relay_handler;
use crate::state::AppState;

/// Create the relay router.
pub fn create_relay_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws", get(relay_handler))
        .layer(TraceLayer::new_for_http())
}
