//! # robin-core - Core Domain Types
//!
//! Foundation crate for Road Robin. Provides domain types, error handling,
//! the notification policy, status events, and configuration.
//!
//! This crate has **zero internal dependencies** -- it only depends on
//! external crates (serde, chrono, thiserror, rand, toml, tracing).
//!
//! ## Public API
//!
//! ### Notification Policy (`policy`)
//! - [`NotificationPolicy`] - The pure when-and-what-to-speak state machine
//! - [`Action`] - Silent / greeting+alert / alert / filler
//! - [`NotificationState`] - Repetition-suppression and idle-timer state
//! - [`DetectionResult`] - One classifier verdict per frame
//!
//! ### Events (`events`)
//! - [`StatusEvent`] - SystemStatus / SignDetected / ErrorReported
//! - [`SystemStatus`] - starting / running / stopped / error
//!
//! ### Utterances (`phrases`)
//! - [`UtterancePools`] - Greeting, alert, and filler templates as config data
//! - [`Selector`] - Swappable pool-selection strategy (uniform / fixed)
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ### Configuration (`config`)
//! - [`Settings`] - `.robin/config.toml` with defaults
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use robin_core::prelude::*;
//! ```

pub mod config;
pub mod distance;
pub mod error;
pub mod events;
pub mod logging;
pub mod phrases;
pub mod policy;
pub mod signs;

/// Prelude for common imports used throughout all Road Robin crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use config::Settings;
pub use error::{Error, Result, ResultExt};
pub use events::{
    ClientFrame, ErrorBody, SignDetectedBody, StatusEvent, SystemStatus, SystemStatusBody,
};
pub use phrases::{FixedSelector, Selector, UniformSelector, UtterancePools};
pub use policy::{Action, DetectionResult, NotificationPolicy, NotificationState};
pub use signs::{class_name, CLASS_NAMES};
