//! End-to-end control-plane scenario
//!
//! The §-by-§ lifecycle: a front end starts the system for driver Ken, a
//! subscriber watches the status stream, the worker (simulated through
//! its notification routes) comes up and detects a Stop sign, and a stop
//! request tears everything down. Worker-side speech decisions are
//! covered by the policy and runner unit tests; this test pins the
//! process-boundary choreography.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio_tungstenite::tungstenite::protocol::Message;

use robin_server::test_utils::FakeBackend;
use robin_server::{AppState, StatusBroadcaster, Supervisor};

type WsClient = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

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
async fn start_detect_stop_choreography() {
    let backend = FakeBackend::new();
    let broadcaster = StatusBroadcaster::new();
    let supervisor = Arc::new(Supervisor::new(
        backend.clone(),
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
    let base = format!("http://{addr}");
    let http = reqwest::Client::new();

    // A subscriber is already watching; it is caught up as stopped.
    let (mut subscriber, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();
    let frame = next_frame(&mut subscriber).await;
    assert_eq!(frame["status"], "stopped");

    // Front end: start the system for Ken.
    let body: serde_json::Value = http
        .post(format!("{base}/start"))
        .json(&serde_json::json!({"driver_name": "Ken"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["success"], true);

    // The supervisor spawned the worker with Ken as its argument.
    let spawns = backend.spawns();
    assert_eq!(spawns.len(), 1);
    assert_eq!(spawns[0].1, vec!["Ken".to_string()]);

    let frame = next_frame(&mut subscriber).await;
    assert_eq!(frame["status"], "starting");

    // The worker reports itself running and announces a detection.
    http.post(format!("{base}/system_status"))
        .json(&serde_json::json!({"status": "running"}))
        .send()
        .await
        .unwrap();
    http.post(format!("{base}/sign_detected"))
        .json(&serde_json::json!({"name": "Stop"}))
        .send()
        .await
        .unwrap();

    let frame = next_frame(&mut subscriber).await;
    assert_eq!(frame["status"], "running");
    let frame = next_frame(&mut subscriber).await;
    assert_eq!(
        frame,
        serde_json::json!({"event": "sign_detected", "name": "Stop"})
    );

    // Front end: stop. The worker goes down and every subscriber hears it.
    let body: serde_json::Value = http
        .post(format!("{base}/stop"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(backend.terminated(), vec![backend.last_pid().unwrap()]);

    let frame = next_frame(&mut subscriber).await;
    assert_eq!(
        frame,
        serde_json::json!({"event": "system_status", "status": "stopped"})
    );
}
