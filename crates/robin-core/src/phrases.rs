//! Utterance pools and selection strategy
//!
//! The spoken phrases are configuration data, not code: every category is
//! an enumerated pool that `.robin/config.toml` may override. Selection
//! over a pool is a swappable [`Selector`] strategy so tests can pin the
//! pick while production selects uniformly at random.

use rand::Rng;
use serde::Deserialize;

/// Placeholders understood by the alert/greeting templates.
///
/// `{driver}`, `{assistant}`, `{salutation}`, `{class}` and `{distance}`
/// are substituted at render time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UtterancePools {
    /// Spoken once, prepended to the first alert ever.
    pub greeting: String,

    /// Alert paraphrases for subsequent class-change detections.
    pub alerts: Vec<String>,

    /// Idle-time driving tips and jokes.
    pub fillers: Vec<String>,
}

impl Default for UtterancePools {
    fn default() -> Self {
        Self {
            greeting: "{salutation}, {driver}. I'm {assistant}, your driving aid today. \
                       All systems are now up and running."
                .to_string(),
            alerts: vec![
                "Please be on the lookout for {class}, {distance}.".to_string(),
                "Hey {driver}, heads up! There's a {class} {distance}.".to_string(),
                "Just a heads-up, {driver}. There's a {class} {distance}.".to_string(),
                "Stay alert, {driver}! A {class} is {distance}.".to_string(),
                "{driver}, watch out for the {class} {distance}.".to_string(),
            ],
            fillers: vec![
                "Quick tip, {driver}: keep a three second gap to the car in front.".to_string(),
                "Remember to check your mirrors every few seconds.".to_string(),
                "Easing off the accelerator early beats braking late.".to_string(),
                "Staying hydrated keeps your reaction time sharp.".to_string(),
                "Why did the traffic light turn red? You would too, if you had to \
                 change in the middle of the road."
                    .to_string(),
            ],
        }
    }
}

impl UtterancePools {
    /// Render a template with the given substitutions. Unknown
    /// placeholders are left untouched.
    pub fn render(template: &str, subs: &[(&str, &str)]) -> String {
        let mut out = template.to_string();
        for (key, value) in subs {
            out = out.replace(&format!("{{{}}}", key), value);
        }
        out
    }
}

// ─────────────────────────────────────────────────────────
// Selection Strategy
// ─────────────────────────────────────────────────────────

/// Strategy for picking one entry out of a pool of `len` candidates.
pub trait Selector: Send {
    /// Return an index in `0..len`. `len` is always at least 1.
    fn pick(&mut self, len: usize) -> usize;
}

/// Production strategy: uniform random over the pool.
#[derive(Debug, Default)]
pub struct UniformSelector;

impl Selector for UniformSelector {
    fn pick(&mut self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// Test strategy: always the same index (clamped into range).
#[derive(Debug)]
pub struct FixedSelector(pub usize);

impl Selector for FixedSelector {
    fn pick(&mut self, len: usize) -> usize {
        self.0.min(len - 1)
    }
}

// ─────────────────────────────────────────────────────────
// Salutation
// ─────────────────────────────────────────────────────────

/// Time-of-day salutation: morning 5-11, afternoon 12-17, evening otherwise.
pub fn salutation_for_hour(hour: u32) -> &'static str {
    match hour {
        5..=11 => "Good Morning",
        12..=17 => "Good Afternoon",
        _ => "Good Evening",
    }
}
