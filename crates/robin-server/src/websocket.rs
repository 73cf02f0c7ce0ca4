//! Status broadcast over WebSocket
//!
//! Subscribers connect to `GET /ws` and receive every [`StatusEvent`] as
//! a JSON frame, preceded by the current status so a late joiner is
//! never stuck unaware until the next transition. A subscriber may push
//! a `toggle_system` override, which is rebroadcast to the other
//! subscribers without being validated against the supervisor's real
//! state.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use robin_core::events::{ClientFrame, StatusEvent, SystemStatus};

use crate::backend::ProcessBackend;
use crate::broadcast::{StatusBroadcaster, Subscription};
use crate::http::AppState;

/// WebSocket upgrade handler for `GET /ws`.
pub async fn websocket_handler<B>(
    ws: WebSocketUpgrade,
    State(state): State<AppState<B>>,
) -> Response
where
    B: ProcessBackend + Send + Sync + 'static,
{
    let broadcaster = state.broadcaster.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, broadcaster))
}

async fn handle_socket(socket: WebSocket, broadcaster: StatusBroadcaster) {
    let Subscription {
        id,
        current,
        mut receiver,
    } = broadcaster.subscribe();
    info!("Status subscriber {} connected", id);

    let (mut sender, mut incoming) = socket.split();

    // Late-joiner catch-up: current status first, before any event.
    let catch_up = StatusEvent::SystemStatus(current).to_ws_frame();
    if sender.send(Message::Text(catch_up)).await.is_err() {
        debug!("Subscriber {} dropped before catch-up", id);
        return;
    }

    // Forward broadcast events to this subscriber on its own task, so a
    // slow socket only ever lags its own queue.
    let send_task = tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(published) => {
                    // An override is not echoed back to its sender.
                    if published.origin == Some(id) {
                        continue;
                    }
                    let frame = published.event.to_ws_frame();
                    if sender.send(Message::Text(frame)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Subscriber {} lagged, {} event(s) dropped", id, skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Handle frames pushed by the subscriber.
    while let Some(message) = incoming.next().await {
        match message {
            Ok(Message::Text(text)) => match ClientFrame::parse(&text) {
                Some(ClientFrame::ToggleSystem { status }) => {
                    handle_override(&broadcaster, id, &status);
                }
                None => {
                    debug!("Subscriber {} sent unhandled frame: {}", id, text);
                }
            },
            Ok(Message::Close(_)) => {
                debug!("Subscriber {} closed the connection", id);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                debug!("Subscriber {} socket error: {}", id, e);
                break;
            }
        }
    }

    send_task.abort();
    info!("Status subscriber {} disconnected", id);
}

/// Administrative status override: rebroadcast to the other subscribers
/// and fold into the catch-up value. Deliberately does NOT touch the
/// supervisor's process bookkeeping.
fn handle_override(broadcaster: &StatusBroadcaster, origin: u64, status: &str) {
    let Some(status) = SystemStatus::parse(status) else {
        warn!("Subscriber {} pushed unknown status override {:?}", origin, status);
        return;
    };
    info!("Subscriber {} overrides status to {}", origin, status);
    broadcaster.publish_from(Some(origin), StatusEvent::SystemStatus(status));
}
