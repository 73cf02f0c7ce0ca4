//! Status-stream integration tests over a real WebSocket
//!
//! Connects tokio-tungstenite clients to the `/ws` endpoint and drives
//! events through the worker-inbound HTTP routes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;

use robin_server::test_utils::FakeBackend;
use robin_server::{AppState, StatusBroadcaster, Supervisor};

type WsClient = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn spawn_control_plane(backend: FakeBackend) -> (String, String) {
    let broadcaster = StatusBroadcaster::new();
    let supervisor = Arc::new(Supervisor::new(
        backend,
        broadcaster.clone(),
        PathBuf::from("/opt/robin/robin-worker"),
    ));
    let state = AppState {
        supervisor,
        broadcaster,
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = robin_server::serve(listener, state).await;
    });

    (format!("http://{addr}"), format!("ws://{addr}/ws"))
}

async fn connect(ws_url: &str) -> WsClient {
    let (client, _response) = tokio_tungstenite::connect_async(ws_url)
        .await
        .expect("websocket connect");
    client
}

/// Receive the next text frame as JSON, with a test-failure timeout.
async fn next_frame(client: &mut WsClient) -> serde_json::Value {
    let message = tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .expect("timed out waiting for frame")
        .expect("stream ended")
        .expect("socket error");
    match message {
        Message::Text(text) => serde_json::from_str(&text).expect("frame is JSON"),
        other => panic!("expected text frame, got {other:?}"),
    }
}

#[tokio::test]
async fn subscriber_is_caught_up_on_connect() {
    let (_base, ws_url) = spawn_control_plane(FakeBackend::new()).await;

    let mut client = connect(&ws_url).await;
    let frame = next_frame(&mut client).await;
    assert_eq!(
        frame,
        serde_json::json!({"event": "system_status", "status": "stopped"})
    );
}

#[tokio::test]
async fn late_subscriber_sees_current_status_before_any_event() {
    let (base, ws_url) = spawn_control_plane(FakeBackend::new()).await;
    let http = reqwest::Client::new();

    // Move the system to running before anyone subscribes.
    http.post(format!("{base}/system_status"))
        .json(&serde_json::json!({"status": "running"}))
        .send()
        .await
        .unwrap();

    let mut late = connect(&ws_url).await;
    let frame = next_frame(&mut late).await;
    assert_eq!(frame["status"], "running");
}

#[tokio::test]
async fn worker_events_reach_every_subscriber() {
    let (base, ws_url) = spawn_control_plane(FakeBackend::new()).await;
    let http = reqwest::Client::new();

    let mut a = connect(&ws_url).await;
    let mut b = connect(&ws_url).await;
    next_frame(&mut a).await; // catch-up
    next_frame(&mut b).await;

    http.post(format!("{base}/sign_detected"))
        .json(&serde_json::json!({"name": "Stop"}))
        .send()
        .await
        .unwrap();
    http.post(format!("{base}/error"))
        .json(&serde_json::json!({"message": "Failed to capture frame"}))
        .send()
        .await
        .unwrap();

    for client in [&mut a, &mut b] {
        let frame = next_frame(client).await;
        assert_eq!(
            frame,
            serde_json::json!({"event": "sign_detected", "name": "Stop"})
        );
        let frame = next_frame(client).await;
        assert_eq!(
            frame,
            serde_json::json!({"event": "error", "message": "Failed to capture frame"})
        );
    }
}

#[tokio::test]
async fn toggle_override_reaches_other_subscribers_only() {
    let (base, ws_url) = spawn_control_plane(FakeBackend::new()).await;

    let mut pusher = connect(&ws_url).await;
    let mut observer = connect(&ws_url).await;
    next_frame(&mut pusher).await;
    next_frame(&mut observer).await;

    pusher
        .send(Message::Text(
            r#"{"event":"toggle_system","status":"error"}"#.to_string().into(),
        ))
        .await
        .unwrap();

    // The other subscriber receives the override...
    let frame = next_frame(&mut observer).await;
    assert_eq!(
        frame,
        serde_json::json!({"event": "system_status", "status": "error"})
    );

    // ...the sender does not get an echo...
    let echo = tokio::time::timeout(Duration::from_millis(300), pusher.next()).await;
    assert!(echo.is_err(), "override must not be echoed to its sender");

    // ...and the supervisor's real bookkeeping is untouched: stopping
    // still reports that nothing was running.
    let body: serde_json::Value = reqwest::Client::new()
        .post(format!("{base}/stop"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["message"], "System is not running");
}

#[tokio::test]
async fn override_updates_catch_up_value() {
    let (_base, ws_url) = spawn_control_plane(FakeBackend::new()).await;

    let mut pusher = connect(&ws_url).await;
    next_frame(&mut pusher).await;
    pusher
        .send(Message::Text(
            r#"{"event":"toggle_system","status":"running"}"#.to_string().into(),
        ))
        .await
        .unwrap();

    // Give the override a moment to land before the late join.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut late = connect(&ws_url).await;
    let frame = next_frame(&mut late).await;
    assert_eq!(frame["status"], "running");
}
