//! Scripted collaborator fakes for detection-loop tests
//!
//! These operate at the trait boundary, not the process level: no camera
//! device, no model host, no TTS engine. A [`ScriptedCamera`] hands out
//! a fixed number of synthetic frames and then reports itself gone, a
//! [`ScriptedClassifier`] replays canned verdicts, and a
//! [`ScriptedSpeech`] records utterances instead of rendering them.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use robin_core::policy::DetectionResult;
use robin_core::prelude::*;

use crate::camera::{Frame, FrameSource};
use crate::classifier::LocalSignClassifier;
use crate::speech::SpeechSink;

/// Frame source that yields `n` synthetic frames, then reports the
/// camera as permanently unavailable.
pub struct ScriptedCamera {
    remaining: usize,
    released: Arc<AtomicBool>,
}

impl ScriptedCamera {
    pub fn with_frames(n: usize) -> Self {
        Self {
            remaining: n,
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag flipped by `close()`; lets tests assert resource release.
    pub fn released_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.released)
    }
}

impl FrameSource for ScriptedCamera {
    fn next_frame(&mut self) -> Result<Frame> {
        if self.remaining == 0 {
            return Err(Error::camera_unavailable("scripted frames exhausted"));
        }
        self.remaining -= 1;
        Ok(Frame::new_luma8(32, 32))
    }

    fn close(&mut self) {
        self.released.store(true, Ordering::Release);
    }
}

/// Classifier that replays canned results.
pub struct ScriptedClassifier {
    results: VecDeque<Result<DetectionResult>>,
    /// Repeated once `results` runs dry, if set.
    fallback: Option<DetectionResult>,
}

impl ScriptedClassifier {
    pub fn with_results(results: Vec<Result<DetectionResult>>) -> Self {
        Self {
            results: results.into(),
            fallback: None,
        }
    }

    pub fn repeating(result: DetectionResult) -> Self {
        Self {
            results: VecDeque::new(),
            fallback: Some(result),
        }
    }
}

impl LocalSignClassifier for ScriptedClassifier {
    async fn classify(&mut self, _input: &[f32]) -> Result<DetectionResult> {
        if let Some(scripted) = self.results.pop_front() {
            return scripted;
        }
        match &self.fallback {
            Some(result) => Ok(result.clone()),
            None => Err(Error::classify("no scripted result left")),
        }
    }
}

/// Speech sink that records utterances instead of rendering them.
#[derive(Clone, Default)]
pub struct ScriptedSpeech {
    utterances: Arc<Mutex<Vec<String>>>,
    busy: Arc<AtomicBool>,
}

impl ScriptedSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything spoken so far, in order.
    pub fn utterances(&self) -> Vec<String> {
        self.utterances.lock().unwrap().clone()
    }

    /// Simulate a still-rendering utterance.
    pub fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::Release);
    }
}

impl SpeechSink for ScriptedSpeech {
    fn speak(&self, text: &str) -> bool {
        if self.is_busy() {
            return false;
        }
        self.utterances.lock().unwrap().push(text.to_string());
        true
    }

    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}
