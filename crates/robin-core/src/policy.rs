//! Notification policy: when to speak, and what
//!
//! [`NotificationPolicy`] is the pure decision core of the detection
//! worker: it is fed one classifier result per processed frame and
//! answers with an [`Action`]. It performs no I/O; executing the action
//! (speech, outbound events) is the worker's job. The only state it
//! owns is [`NotificationState`], and it is the only writer of it.

use std::time::{Duration, Instant};

use crate::config::Settings;
use crate::distance;
use crate::phrases::{self, Selector, UniformSelector, UtterancePools};

// ─────────────────────────────────────────────────────────
// Inputs and Outputs
// ─────────────────────────────────────────────────────────

/// One classifier verdict for a processed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    pub class_id: usize,
    pub class_name: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
}

/// What the worker should do with the current frame's result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Say nothing.
    Silent,
    /// First qualifying detection ever: salutation + introduction,
    /// concatenated with the alert for the detected class.
    SpeakGreetingThenAlert(String),
    /// A class-change alert.
    SpeakAlert(String),
    /// Idle-time driving tip or joke.
    SpeakFiller(String),
}

impl Action {
    /// The utterance to render, if any.
    pub fn utterance(&self) -> Option<&str> {
        match self {
            Action::Silent => None,
            Action::SpeakGreetingThenAlert(text)
            | Action::SpeakAlert(text)
            | Action::SpeakFiller(text) => Some(text),
        }
    }
}

/// Mutable policy state. Owned exclusively by [`NotificationPolicy`].
#[derive(Debug)]
pub struct NotificationState {
    /// Class name of the most recently spoken alert.
    pub last_spoken_class: Option<String>,
    /// Number of spoken class-change alerts. Increments exactly once per
    /// class change, never on repeats of the same class.
    pub detection_count: u64,
    /// Monotonic timestamp of the last qualifying detection (or filler).
    pub last_detection: Instant,
    /// Whether the one-time greeting has been spoken.
    pub first_detection_done: bool,
}

// ─────────────────────────────────────────────────────────
// Policy
// ─────────────────────────────────────────────────────────

/// The notification decision state machine.
pub struct NotificationPolicy {
    threshold: f32,
    idle_timeout: Duration,
    driver_name: String,
    assistant_name: String,
    focal_length: f32,
    known_sign_width_m: f32,
    pools: UtterancePools,
    selector: Box<dyn Selector>,
    /// Wall-clock hour source for the salutation. Injectable for tests.
    hour_source: fn() -> u32,
    state: NotificationState,
}

fn local_hour() -> u32 {
    use chrono::Timelike;
    chrono::Local::now().hour()
}

impl NotificationPolicy {
    /// Build a policy from settings. `now` seeds the idle timer so the
    /// first filler is measured from worker startup.
    pub fn new(driver_name: impl Into<String>, settings: &Settings, now: Instant) -> Self {
        Self {
            threshold: settings.threshold,
            idle_timeout: Duration::from_secs(settings.idle_timeout_secs),
            driver_name: driver_name.into(),
            assistant_name: settings.assistant_name.clone(),
            focal_length: settings.focal_length,
            known_sign_width_m: settings.known_sign_width_m,
            pools: settings.phrases.clone(),
            selector: Box::new(UniformSelector),
            hour_source: local_hour,
            state: NotificationState {
                last_spoken_class: None,
                detection_count: 0,
                last_detection: now,
                first_detection_done: false,
            },
        }
    }

    /// Replace the selection strategy (tests inject [`phrases::FixedSelector`]).
    pub fn with_selector(mut self, selector: Box<dyn Selector>) -> Self {
        self.selector = selector;
        self
    }

    /// Replace the wall-clock hour source.
    pub fn with_hour_source(mut self, hour_source: fn() -> u32) -> Self {
        self.hour_source = hour_source;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn state(&self) -> &NotificationState {
        &self.state
    }

    /// Decide what to do with one classifier result.
    ///
    /// Below-threshold confidence and same-class repeats are silent and
    /// leave the state untouched. A class change produces an alert (with
    /// the one-time greeting prepended on the very first), advances
    /// `detection_count`, and restarts the idle timer.
    pub fn decide(&mut self, result: &DetectionResult, now: Instant) -> Action {
        if result.confidence <= self.threshold {
            return Action::Silent;
        }

        if self.state.last_spoken_class.as_deref() == Some(result.class_name.as_str()) {
            return Action::Silent;
        }

        let alert = self.render_alert(&result.class_name);
        let action = if self.state.first_detection_done {
            Action::SpeakAlert(alert)
        } else {
            self.state.first_detection_done = true;
            let greeting = self.render_greeting();
            Action::SpeakGreetingThenAlert(format!("{} {}", greeting, alert))
        };

        self.state.last_spoken_class = Some(result.class_name.clone());
        self.state.detection_count += 1;
        self.state.last_detection = now;
        action
    }

    /// Idle-time check, run once per loop iteration independently of
    /// detections. Produces at most one filler per idle period: firing
    /// resets the timer, so the next filler is another full timeout away.
    pub fn idle_filler(&mut self, now: Instant) -> Option<Action> {
        if self.pools.fillers.is_empty() {
            return None;
        }
        if now.duration_since(self.state.last_detection) <= self.idle_timeout {
            return None;
        }
        self.state.last_detection = now;

        let index = self.selector.pick(self.pools.fillers.len());
        let text = UtterancePools::render(
            &self.pools.fillers[index],
            &[("driver", &self.driver_name)],
        );
        Some(Action::SpeakFiller(text))
    }

    fn render_greeting(&mut self) -> String {
        let salutation = phrases::salutation_for_hour((self.hour_source)());
        UtterancePools::render(
            &self.pools.greeting,
            &[
                ("salutation", salutation),
                ("driver", &self.driver_name),
                ("assistant", &self.assistant_name),
            ],
        )
    }

    fn render_alert(&mut self, class_name: &str) -> String {
        let meters = distance::estimate(
            distance::STAND_IN_OBJECT_WIDTH_PX,
            self.focal_length,
            self.known_sign_width_m,
        );
        let distance_text = distance::phrase(meters);

        let index = self.selector.pick(self.pools.alerts.len());
        UtterancePools::render(
            &self.pools.alerts[index],
            &[
                ("driver", &self.driver_name),
                ("class", class_name),
                ("distance", &distance_text),
            ],
        )
    }
}

impl std::fmt::Debug for NotificationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationPolicy")
            .field("threshold", &self.threshold)
            .field("idle_timeout", &self.idle_timeout)
            .field("state", &self.state)
            .finish()
    }
}
