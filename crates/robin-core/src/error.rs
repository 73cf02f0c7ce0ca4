//! Application error types with rich context

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Camera Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Camera unavailable: {reason}")]
    CameraUnavailable { reason: String },

    #[error("Failed to capture frame: {reason}")]
    FrameRead { reason: String },

    #[error("Error processing frame: {reason}")]
    FrameProcessing { reason: String },

    // ─────────────────────────────────────────────────────────────
    // Classifier Model Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Classifier model unavailable: {reason}")]
    ModelUnavailable { reason: String },

    #[error("Classification failed: {reason}")]
    Classify { reason: String },

    // ─────────────────────────────────────────────────────────────
    // Speech Errors
    // ─────────────────────────────────────────────────────────────
    #[error("No text-to-speech engine found. Install espeak-ng, espeak or say.")]
    SpeechUnavailable,

    // ─────────────────────────────────────────────────────────────
    // Supervisor Errors
    // ─────────────────────────────────────────────────────────────
    #[error("System is already running")]
    AlreadyRunning,

    #[error("Worker binary not found: {path}")]
    WorkerNotFound { path: PathBuf },

    #[error("Failed to spawn worker process: {reason}")]
    ProcessSpawn { reason: String },

    #[error("Failed to terminate process {pid}: {reason}")]
    Terminate { pid: u32, reason: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid configuration: {message}")]
    ConfigInvalid { message: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn camera_unavailable(reason: impl Into<String>) -> Self {
        Self::CameraUnavailable {
            reason: reason.into(),
        }
    }

    pub fn frame_read(reason: impl Into<String>) -> Self {
        Self::FrameRead {
            reason: reason.into(),
        }
    }

    pub fn frame_processing(reason: impl Into<String>) -> Self {
        Self::FrameProcessing {
            reason: reason.into(),
        }
    }

    pub fn model_unavailable(reason: impl Into<String>) -> Self {
        Self::ModelUnavailable {
            reason: reason.into(),
        }
    }

    pub fn classify(reason: impl Into<String>) -> Self {
        Self::Classify {
            reason: reason.into(),
        }
    }

    pub fn process_spawn(reason: impl Into<String>) -> Self {
        Self::ProcessSpawn {
            reason: reason.into(),
        }
    }

    pub fn terminate(pid: u32, reason: impl Into<String>) -> Self {
        Self::Terminate {
            pid,
            reason: reason.into(),
        }
    }

    /// Check if this is a recoverable error.
    ///
    /// Recoverable errors are reported and the detection loop continues
    /// with the next frame.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::FrameRead { .. }
                | Error::FrameProcessing { .. }
                | Error::Classify { .. }
                | Error::Terminate { .. }
        )
    }

    /// Check if this error should terminate the worker process
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::CameraUnavailable { .. }
                | Error::ModelUnavailable { .. }
                | Error::SpeechUnavailable
                | Error::WorkerNotFound { .. }
                | Error::ProcessSpawn { .. }
        )
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions (for use with color-eyre)
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}
