//! Classifier model boundary
//!
//! The trained model is an opaque collaborator: preprocessed pixels in,
//! `(class, confidence)` out. [`ModelProcess`] hosts it as a long-lived
//! child process speaking line-delimited JSON over stdin/stdout, so the
//! model runtime (and its dependency stack) stays out of this process.

use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use robin_core::policy::DetectionResult;
use robin_core::prelude::*;
use robin_core::signs;

/// Classify one preprocessed frame.
///
/// Errors split the same way as the camera's: [`Error::Classify`] is
/// per-frame (report and continue), [`Error::ModelUnavailable`] is final.
#[trait_variant::make(SignClassifier: Send)]
pub trait LocalSignClassifier {
    async fn classify(&mut self, input: &[f32]) -> Result<DetectionResult>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModelRequest<'a> {
    id: u64,
    input: &'a [f32],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelResponse {
    id: u64,
    class_id: usize,
    confidence: f32,
}

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Manages the classifier child process.
///
/// One request is in flight at a time; responses are correlated by `id`
/// and stray lines (model logs, stale responses) are skipped.
pub struct ModelProcess {
    /// Held for its kill-on-drop guarantee.
    _child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    request_timeout: Duration,
}

impl ModelProcess {
    /// Spawn the model host command.
    pub async fn spawn(command: &str, args: &[String]) -> Result<Self> {
        info!("Spawning classifier model host: {} {}", command, args.join(" "));

        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true) // Critical: cleanup on drop
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::model_unavailable(format!("command not found: {command}"))
                } else {
                    Error::model_unavailable(e.to_string())
                }
            })?;

        info!("Model host started with PID: {:?}", child.id());

        let stdin = child.stdin.take().expect("stdin was configured");
        let stdout = child.stdout.take().expect("stdout was configured");

        Ok(Self {
            _child: child,
            stdin,
            lines: BufReader::new(stdout).lines(),
            next_id: 0,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Override the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    async fn read_response(&mut self, id: u64) -> Result<ModelResponse> {
        loop {
            match self.lines.next_line().await {
                Ok(Some(line)) => match serde_json::from_str::<ModelResponse>(&line) {
                    Ok(response) if response.id == id => return Ok(response),
                    Ok(stale) => {
                        trace!("Skipping stale model response id {}", stale.id);
                    }
                    Err(_) => {
                        trace!("Skipping non-response model output: {}", line);
                    }
                },
                Ok(None) => {
                    return Err(Error::model_unavailable("model host closed its stdout"));
                }
                Err(e) => {
                    return Err(Error::model_unavailable(format!("model host read: {e}")));
                }
            }
        }
    }
}

impl LocalSignClassifier for ModelProcess {
    async fn classify(&mut self, input: &[f32]) -> Result<DetectionResult> {
        self.next_id += 1;
        let id = self.next_id;

        let request = serde_json::to_string(&ModelRequest { id, input })?;
        let write = async {
            self.stdin.write_all(request.as_bytes()).await?;
            self.stdin.write_all(b"\n").await?;
            self.stdin.flush().await?;
            std::io::Result::Ok(())
        };
        write
            .await
            .map_err(|e| Error::model_unavailable(format!("model host write: {e}")))?;

        let response = tokio::time::timeout(self.request_timeout, self.read_response(id))
            .await
            .map_err(|_| Error::classify(format!("model response timed out for frame {id}")))??;

        Ok(DetectionResult {
            class_id: response.class_id,
            class_name: signs::class_name(response.class_id).to_string(),
            confidence: response.confidence,
        })
    }
}
