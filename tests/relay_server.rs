//! Relay server integration: spin the router on an ephemeral port and
//! drive it with a real WebSocket client.

use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use parlance_gateway::config::ServerConfig;
use parlance_gateway::routes::create_relay_router;
use parlance_gateway::state::AppState;

fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        api_key: "test-key-not-valid".to_string(),
        model: "models/test".to_string(),
        system_instruction: "test".to_string(),
    }
}

async fn spawn_server() -> String {
    let app_state = AppState::new(test_config());
    let app = create_relay_router().with_state(app_state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("ws://{addr}/ws")
}

/// The readiness ack arrives before the remote session exists, and the
/// connection closes once the (unreachable) live session fails.
#[tokio::test]
async fn test_server_ready_ack_is_first_frame() {
    let url = spawn_server().await;
    let (ws, _response) = connect_async(&url).await.expect("ws connect failed");
    let (_write, mut read) = ws.split();

    let first = timeout(Duration::from_secs(10), read.next())
        .await
        .expect("no frame before timeout")
        .expect("connection closed before any frame")
        .expect("ws error");
    assert_eq!(first, Message::Text("ACK:SERVER_READY".into()));

    // With an unusable API key the live session cannot open; the server
    // must close the connection rather than hang.
    let closed = timeout(Duration::from_secs(30), async {
        loop {
            match read.next().await {
                Some(Ok(Message::Close(_))) | None => return,
                Some(Ok(_)) => continue,
                Some(Err(_)) => return,
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "connection did not close after session failure");
}
