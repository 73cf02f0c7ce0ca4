//! The detection loop
//!
//! One iteration per available frame: acquire → preprocess → classify →
//! feed the notification policy → execute the returned action. Speech
//! and outbound notifications run on detached tasks so a slow engine or
//! unreachable control plane never delays the next capture.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use robin_core::events::SystemStatus;
use robin_core::policy::{Action, NotificationPolicy};
use robin_core::prelude::*;

use crate::camera::FrameSource;
use crate::classifier::LocalSignClassifier;
use crate::notifier::ControlNotifier;
use crate::preprocess;
use crate::speech::SpeechSink;

/// Drive the detection loop until a stop signal, camera loss, or model
/// loss. On every exit path the camera is released and a final
/// `stopped` status is delivered before returning.
pub async fn run<C, M, S>(
    mut camera: C,
    mut classifier: M,
    speech: S,
    notifier: ControlNotifier,
    mut policy: NotificationPolicy,
    stop: Arc<AtomicBool>,
) -> Result<()>
where
    C: FrameSource,
    M: LocalSignClassifier,
    S: SpeechSink,
{
    notifier.system_status(SystemStatus::Running);
    info!("Detection loop running");

    let result = detection_loop(
        &mut camera,
        &mut classifier,
        &speech,
        &notifier,
        &mut policy,
        &stop,
    )
    .await;

    camera.close();
    notifier.system_status_now(SystemStatus::Stopped).await;
    info!("Detection loop stopped");

    result
}

async fn detection_loop<C, M, S>(
    camera: &mut C,
    classifier: &mut M,
    speech: &S,
    notifier: &ControlNotifier,
    policy: &mut NotificationPolicy,
    stop: &AtomicBool,
) -> Result<()>
where
    C: FrameSource,
    M: LocalSignClassifier,
    S: SpeechSink,
{
    let threshold = policy.threshold();

    loop {
        // Cooperative shutdown: checked once per iteration.
        if stop.load(Ordering::Relaxed) {
            info!("Stop signal observed, leaving detection loop");
            return Ok(());
        }

        // Idle-time filler runs independently of detections.
        if let Some(action) = policy.idle_filler(Instant::now()) {
            execute_speech(speech, &action);
        }

        let frame = match camera.next_frame() {
            Ok(frame) => frame,
            Err(e) if e.is_recoverable() => {
                warn!("Frame capture failed: {}", e);
                notifier.error(&e.to_string());
                continue;
            }
            Err(e) => {
                error!("Camera lost: {}", e);
                notifier.error(&e.to_string());
                return Err(e);
            }
        };

        let input = preprocess::preprocess(&frame);

        let result = match classifier.classify(&input).await {
            Ok(result) => result,
            Err(e) if e.is_recoverable() => {
                warn!("Frame classification failed: {}", e);
                notifier.error(&e.to_string());
                continue;
            }
            Err(e) => {
                error!("Classifier model lost: {}", e);
                notifier.error(&e.to_string());
                return Err(e);
            }
        };

        // Every qualifying detection goes out on the event stream, even
        // when repetition suppression keeps it unspoken.
        if result.confidence > threshold {
            trace!(
                "Detected {} ({:.0}%)",
                result.class_name,
                result.confidence * 100.0
            );
            notifier.sign_detected(&result.class_name);
        }

        let action = policy.decide(&result, Instant::now());
        execute_speech(speech, &action);
    }
}

fn execute_speech<S: SpeechSink>(speech: &S, action: &Action) {
    if let Some(text) = action.utterance() {
        if !speech.speak(text) {
            debug!("Utterance skipped, previous one still rendering");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ScriptedCamera, ScriptedClassifier, ScriptedSpeech};
    use robin_core::config::Settings;
    use robin_core::phrases::FixedSelector;
    use robin_core::policy::DetectionResult;

    fn nine_am() -> u32 {
        9
    }

    fn test_policy() -> NotificationPolicy {
        NotificationPolicy::new("Ken", &Settings::default(), Instant::now())
            .with_selector(Box::new(FixedSelector(0)))
            .with_hour_source(nine_am)
    }

    fn dead_end_notifier() -> ControlNotifier {
        // Discard port: deliveries fail fast and are swallowed.
        ControlNotifier::new("http://127.0.0.1:9")
    }

    fn detection(class_name: &str, confidence: f32) -> DetectionResult {
        DetectionResult {
            class_id: 14,
            class_name: class_name.to_string(),
            confidence,
        }
    }

    #[tokio::test]
    async fn test_loop_exits_when_camera_lost() {
        let camera = ScriptedCamera::with_frames(3);
        let released = camera.released_flag();
        let classifier = ScriptedClassifier::repeating(detection("Stop", 0.9));
        let speech = ScriptedSpeech::new();

        let result = run(
            camera,
            classifier,
            speech.clone(),
            dead_end_notifier(),
            test_policy(),
            Arc::new(AtomicBool::new(false)),
        )
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, Error::CameraUnavailable { .. }));
        assert!(released.load(Ordering::Acquire), "camera must be released");

        // Three identical detections: one greeting+alert, then silence.
        let spoken = speech.utterances();
        assert_eq!(spoken.len(), 1, "spoken: {spoken:?}");
        assert!(spoken[0].contains("Good Morning"));
        assert!(spoken[0].contains("Stop"));
    }

    #[tokio::test]
    async fn test_stop_signal_exits_cleanly() {
        let stop = Arc::new(AtomicBool::new(true));
        let camera = ScriptedCamera::with_frames(100);
        let released = camera.released_flag();
        let classifier = ScriptedClassifier::repeating(detection("Stop", 0.9));
        let speech = ScriptedSpeech::new();

        let result = run(
            camera,
            classifier,
            speech.clone(),
            dead_end_notifier(),
            test_policy(),
            stop,
        )
        .await;

        assert!(result.is_ok());
        assert!(released.load(Ordering::Acquire));
        assert!(speech.utterances().is_empty());
    }

    #[tokio::test]
    async fn test_transient_classify_error_continues() {
        let camera = ScriptedCamera::with_frames(3);
        let classifier = ScriptedClassifier::with_results(vec![
            Err(Error::classify("timeout")),
            Ok(detection("Yield", 0.9)),
            Ok(detection("Yield", 0.9)),
        ]);
        let speech = ScriptedSpeech::new();

        let result = run(
            camera,
            classifier,
            speech.clone(),
            dead_end_notifier(),
            test_policy(),
            Arc::new(AtomicBool::new(false)),
        )
        .await;

        // Loop survived the bad frame and kept classifying.
        assert!(result.is_err()); // camera ran out of frames at the end
        let spoken = speech.utterances();
        assert_eq!(spoken.len(), 1);
        assert!(spoken[0].contains("Yield"));
    }

    #[tokio::test]
    async fn test_model_loss_is_fatal() {
        let camera = ScriptedCamera::with_frames(10);
        let released = camera.released_flag();
        let classifier =
            ScriptedClassifier::with_results(vec![Err(Error::model_unavailable("host died"))]);
        let speech = ScriptedSpeech::new();

        let result = run(
            camera,
            classifier,
            speech,
            dead_end_notifier(),
            test_policy(),
            Arc::new(AtomicBool::new(false)),
        )
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, Error::ModelUnavailable { .. }));
        assert!(released.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn test_class_change_speaks_again() {
        let camera = ScriptedCamera::with_frames(4);
        let classifier = ScriptedClassifier::with_results(vec![
            Ok(detection("Stop", 0.9)),
            Ok(detection("Stop", 0.9)),
            Ok(detection("Yield", 0.9)),
            Ok(detection("Speed Limit 50 km/h", 0.5)), // below threshold
        ]);
        let speech = ScriptedSpeech::new();

        let _ = run(
            camera,
            classifier,
            speech.clone(),
            dead_end_notifier(),
            test_policy(),
            Arc::new(AtomicBool::new(false)),
        )
        .await;

        let spoken = speech.utterances();
        assert_eq!(spoken.len(), 2, "spoken: {spoken:?}");
        assert!(spoken[0].contains("Stop"));
        assert!(spoken[1].contains("Yield"));
    }
}
