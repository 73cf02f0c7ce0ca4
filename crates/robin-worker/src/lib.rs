//! # robin-worker - Detection Loop
//!
//! The real-time half of Road Robin: pulls camera frames, feeds the
//! classifier model, applies the notification policy from
//! [`robin_core`], and fires the side effects (speech, outbound status
//! events).
//!
//! The external collaborators are held behind narrow traits so the loop
//! is testable without a camera, model, or TTS engine:
//!
//! ## Public API
//!
//! ### Frame Acquisition (`camera`)
//! - [`FrameSource`] - Blocking frame source with transient/fatal error split
//! - [`DirectoryCamera`] - Prototype source replaying image files
//!
//! ### Classification (`classifier`, `preprocess`)
//! - [`SignClassifier`] / [`LocalSignClassifier`] - Pixels in, verdict out
//! - [`ModelProcess`] - Model hosted as a line-JSON child process
//! - [`preprocess()`] - The model's input contract (32×32 gray, equalized, [0,1])
//!
//! ### Side Effects (`speech`, `notifier`)
//! - [`SpeechSink`] / [`CommandSpeech`] - Detached TTS dispatch with a busy guard
//! - [`ControlNotifier`] - Fire-and-forget status POSTs to the control plane
//!
//! ### The Loop (`runner`)
//! - [`run()`] - One iteration per frame until stop signal or fatal loss

pub mod camera;
pub mod classifier;
pub mod notifier;
pub mod preprocess;
pub mod runner;
pub mod speech;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

pub use camera::{DirectoryCamera, Frame, FrameSource};
pub use classifier::{LocalSignClassifier, ModelProcess, SignClassifier};
pub use notifier::ControlNotifier;
pub use preprocess::{preprocess, MODEL_INPUT_SIZE};
pub use runner::run;
pub use speech::{CommandSpeech, SpeechSink};
