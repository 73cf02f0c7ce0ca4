//! Text-to-speech boundary
//!
//! Speech rendering must never stall frame capture: utterances are
//! dispatched on detached tasks, and an utterance that arrives while the
//! previous one is still rendering is skipped, not queued.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::process::Command;

use robin_core::prelude::*;

/// Non-blocking speech sink.
pub trait SpeechSink: Send {
    /// Dispatch an utterance. Returns `false` when a previous utterance
    /// is still rendering; the new one is dropped.
    fn speak(&self, text: &str) -> bool;

    /// Whether an utterance is currently rendering.
    fn is_busy(&self) -> bool;
}

/// Engines probed in order; all of them take the utterance as a single
/// positional argument.
const TTS_CANDIDATES: &[&str] = &["espeak-ng", "espeak", "say"];

/// Speech sink backed by an external TTS command, one invocation per
/// utterance.
#[derive(Debug, Clone)]
pub struct CommandSpeech {
    program: PathBuf,
    busy: Arc<AtomicBool>,
}

impl CommandSpeech {
    /// Probe PATH for a supported TTS engine.
    pub fn locate() -> Result<Self> {
        for candidate in TTS_CANDIDATES {
            if let Ok(program) = which::which(candidate) {
                info!("Using text-to-speech engine: {}", program.display());
                return Ok(Self::with_program(program));
            }
        }
        Err(Error::SpeechUnavailable)
    }

    /// Use a specific program instead of probing PATH.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl SpeechSink for CommandSpeech {
    fn speak(&self, text: &str) -> bool {
        if self.busy.swap(true, Ordering::AcqRel) {
            debug!("Speech engine busy, skipping utterance");
            return false;
        }

        let program = self.program.clone();
        let busy = Arc::clone(&self.busy);
        let text = text.to_string();

        // Detached on purpose: no join, no cancellation, failures are
        // logged and never reach the detection loop.
        tokio::spawn(async move {
            debug!("Speaking: {}", text);
            let status = Command::new(&program)
                .arg(&text)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await;

            match status {
                Ok(status) if !status.success() => {
                    warn!("TTS engine exited with {:?}", status.code());
                }
                Err(e) => {
                    warn!("Failed to run TTS engine {}: {}", program.display(), e);
                }
                Ok(_) => {}
            }

            busy.store(false, Ordering::Release);
        });

        true
    }

    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}
