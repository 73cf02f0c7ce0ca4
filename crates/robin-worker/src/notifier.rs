//! Outbound notifications to the control plane
//!
//! Best-effort, fire-and-forget HTTP POSTs. A slow or unreachable
//! control plane must never delay the next frame: delivery happens on
//! detached tasks whose failures are logged and dropped.

use std::time::Duration;

use robin_core::events::SystemStatus;
use robin_core::prelude::*;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Handle for posting status events to the control plane.
#[derive(Debug, Clone)]
pub struct ControlNotifier {
    client: reqwest::Client,
    base_url: String,
}

impl ControlNotifier {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `POST /system_status`, fire and forget.
    pub fn system_status(&self, status: SystemStatus) {
        self.post_detached(
            "system_status",
            serde_json::json!({ "status": status.as_str() }),
        );
    }

    /// `POST /sign_detected`, fire and forget.
    pub fn sign_detected(&self, name: &str) {
        self.post_detached("sign_detected", serde_json::json!({ "name": name }));
    }

    /// `POST /error`, fire and forget.
    pub fn error(&self, message: &str) {
        self.post_detached("error", serde_json::json!({ "message": message }));
    }

    /// Deliver an error synchronously. Used right before a fatal exit,
    /// where a detached task would be torn down with the process.
    pub async fn error_now(&self, message: &str) {
        let url = self.url("error");
        let body = serde_json::json!({ "message": message });
        if let Err(e) = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
        {
            debug!("Failed to deliver final error report: {}", e);
        }
    }

    /// Deliver a status synchronously. Used on worker exit paths, where
    /// a detached task would be torn down with the process.
    pub async fn system_status_now(&self, status: SystemStatus) {
        let url = self.url("system_status");
        let body = serde_json::json!({ "status": status.as_str() });
        if let Err(e) = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
        {
            debug!("Failed to deliver final status: {}", e);
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn post_detached(&self, path: &str, body: serde_json::Value) {
        let client = self.client.clone();
        let url = self.url(path);

        // Detached on purpose: no join, no cancellation, no propagation.
        tokio::spawn(async move {
            if let Err(e) = client
                .post(&url)
                .timeout(REQUEST_TIMEOUT)
                .json(&body)
                .send()
                .await
            {
                debug!("Notification to {} failed: {}", url, e);
            }
        });
    }
}
