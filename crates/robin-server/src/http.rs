//! Control-plane HTTP surface
//!
//! Request/response routes for the front end (`/health`, `/start`,
//! `/stop`) and the worker-inbound notification routes
//! (`/system_status`, `/sign_detected`, `/error`). Domain failures such
//! as "already running" are `{success: false, message}` bodies with
//! HTTP 200: they are answers, not transport errors.

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use robin_core::events::{ErrorBody, SignDetectedBody, StatusEvent, SystemStatusBody};
use robin_core::prelude::*;

use crate::backend::ProcessBackend;
use crate::broadcast::StatusBroadcaster;
use crate::supervisor::Supervisor;
use crate::websocket::websocket_handler;
use std::sync::Arc;

/// Shared state for all routes.
pub struct AppState<B> {
    pub supervisor: Arc<Supervisor<B>>,
    pub broadcaster: StatusBroadcaster,
}

impl<B> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            supervisor: Arc::clone(&self.supervisor),
            broadcaster: self.broadcaster.clone(),
        }
    }
}

/// Body of `POST /start`.
#[derive(Debug, Deserialize)]
pub struct StartRequest {
    #[serde(default = "default_driver_name")]
    pub driver_name: String,
}

fn default_driver_name() -> String {
    "Driver".to_string()
}

/// Uniform response body for the request/response surface.
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiResponse {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Build the control-plane router.
pub fn router<B>(state: AppState<B>) -> Router
where
    B: ProcessBackend + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/start", post(start::<B>))
        .route("/stop", post(stop::<B>))
        .route("/system_status", post(system_status::<B>))
        .route("/sign_detected", post(sign_detected::<B>))
        .route("/error", post(error_reported::<B>))
        .route("/ws", get(websocket_handler::<B>))
        .with_state(state)
}

/// Serve the control plane on an already-bound listener.
pub async fn serve<B>(listener: tokio::net::TcpListener, state: AppState<B>) -> Result<()>
where
    B: ProcessBackend + Send + Sync + 'static,
{
    info!("Control plane listening on {:?}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

async fn start<B>(
    State(state): State<AppState<B>>,
    Json(request): Json<StartRequest>,
) -> Json<ApiResponse>
where
    B: ProcessBackend + Send + Sync + 'static,
{
    info!("Start requested for driver {:?}", request.driver_name);
    match state.supervisor.start(&request.driver_name).await {
        Ok(()) => Json(ApiResponse::ok("System started successfully")),
        Err(e) => {
            warn!("Start rejected: {}", e);
            Json(ApiResponse::fail(e.to_string()))
        }
    }
}

async fn stop<B>(State(state): State<AppState<B>>) -> Json<ApiResponse>
where
    B: ProcessBackend + Send + Sync + 'static,
{
    info!("Stop requested");
    match state.supervisor.stop().await {
        Ok(true) => Json(ApiResponse::ok("System stopped successfully")),
        Ok(false) => Json(ApiResponse::ok("System is not running")),
        Err(e) => Json(ApiResponse::fail(e.to_string())),
    }
}

async fn system_status<B>(
    State(state): State<AppState<B>>,
    Json(body): Json<SystemStatusBody>,
) -> Json<ApiResponse>
where
    B: ProcessBackend + Send + Sync + 'static,
{
    state.supervisor.note_worker_status(body.status).await;
    state
        .broadcaster
        .publish(StatusEvent::SystemStatus(body.status));
    Json(ApiResponse {
        success: true,
        message: None,
    })
}

async fn sign_detected<B>(
    State(state): State<AppState<B>>,
    Json(body): Json<SignDetectedBody>,
) -> Json<ApiResponse>
where
    B: ProcessBackend + Send + Sync + 'static,
{
    info!("Sign detected: {}", body.name);
    state.broadcaster.publish(StatusEvent::SignDetected(body.name));
    Json(ApiResponse {
        success: true,
        message: None,
    })
}

async fn error_reported<B>(
    State(state): State<AppState<B>>,
    Json(body): Json<ErrorBody>,
) -> Json<ApiResponse>
where
    B: ProcessBackend + Send + Sync + 'static,
{
    warn!("Worker reported error: {}", body.message);
    state
        .broadcaster
        .publish(StatusEvent::ErrorReported(body.message));
    Json(ApiResponse {
        success: true,
        message: None,
    })
}
