//! Status events flowing from the detection worker to the control plane
//! and out to status-stream subscribers.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────
// System Status
// ─────────────────────────────────────────────────────────

/// Coarse lifecycle status of the detection system, as reported on the
/// wire (`starting|running|stopped|error`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemStatus {
    Starting,
    Running,
    Stopped,
    Error,
}

impl SystemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemStatus::Starting => "starting",
            SystemStatus::Running => "running",
            SystemStatus::Stopped => "stopped",
            SystemStatus::Error => "error",
        }
    }

    /// Parse a wire status string. Unknown strings are rejected rather
    /// than mapped to a default.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "starting" => Some(SystemStatus::Starting),
            "running" => Some(SystemStatus::Running),
            "stopped" => Some(SystemStatus::Stopped),
            "error" => Some(SystemStatus::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────
// Notification Bodies (worker → control plane, HTTP)
// ─────────────────────────────────────────────────────────

/// Body of `POST /system_status`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SystemStatusBody {
    pub status: SystemStatus,
}

/// Body of `POST /sign_detected`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignDetectedBody {
    pub name: String,
}

/// Body of `POST /error`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

// ─────────────────────────────────────────────────────────
// StatusEvent
// ─────────────────────────────────────────────────────────

/// A single unit of the outbound status stream.
///
/// Events are appended in emission order; late subscribers receive only
/// the current [`SystemStatus`] value as catch-up, never a history replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    SystemStatus(SystemStatus),
    SignDetected(String),
    ErrorReported(String),
}

impl StatusEvent {
    /// Encode this event as a status-stream (WebSocket) JSON frame.
    pub fn to_ws_frame(&self) -> String {
        let value = match self {
            StatusEvent::SystemStatus(status) => serde_json::json!({
                "event": "system_status",
                "status": status.as_str(),
            }),
            StatusEvent::SignDetected(name) => serde_json::json!({
                "event": "sign_detected",
                "name": name,
            }),
            StatusEvent::ErrorReported(message) => serde_json::json!({
                "event": "error",
                "message": message,
            }),
        };
        value.to_string()
    }

    /// Get a human-readable summary
    pub fn summary(&self) -> String {
        match self {
            StatusEvent::SystemStatus(status) => format!("System {}", status),
            StatusEvent::SignDetected(name) => format!("Sign detected: {}", name),
            StatusEvent::ErrorReported(message) => format!("Error: {}", message),
        }
    }
}

// ─────────────────────────────────────────────────────────
// Client Frames (subscriber → control plane, WebSocket)
// ─────────────────────────────────────────────────────────

/// Messages a status-stream subscriber may push to the server.
///
/// The only supported frame is an administrative status override, which
/// the server rebroadcasts verbatim to the other subscribers without
/// validating it against the supervisor's real state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    ToggleSystem { status: String },
}

impl ClientFrame {
    /// Parse a client frame. Unknown events and malformed JSON yield `None`.
    pub fn parse(json: &str) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_str(json).ok()?;
        match value.get("event").and_then(|v| v.as_str())? {
            "toggle_system" => {
                let status = value.get("status").and_then(|v| v.as_str())?.to_string();
                Some(ClientFrame::ToggleSystem { status })
            }
            _ => None,
        }
    }
}
