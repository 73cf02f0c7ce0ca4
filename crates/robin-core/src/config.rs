//! Settings parser for .robin/config.toml

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result, ResultExt};
use crate::phrases::UtterancePools;

const CONFIG_FILENAME: &str = "config.toml";
const ROBIN_DIR: &str = ".robin";

/// Tunables shared by the control plane and the detection worker.
///
/// Every field has a default; a missing config file means "all defaults".
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Confidence strictly above this value qualifies a detection.
    pub threshold: f32,

    /// Seconds of no qualifying detection before filler content fires.
    pub idle_timeout_secs: u64,

    /// Spoken name the assistant introduces itself with.
    pub assistant_name: String,

    /// Control-plane listen port.
    pub control_port: u16,

    /// Pre-calibrated camera focal length (pixels).
    pub focal_length: f32,

    /// Known physical sign width (meters) for the distance model.
    pub known_sign_width_m: f32,

    /// Utterance pools, overridable per category.
    pub phrases: UtterancePools,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            threshold: 0.75,
            idle_timeout_secs: 300,
            assistant_name: "Robin".to_string(),
            control_port: 5000,
            focal_length: crate::distance::DEFAULT_FOCAL_LENGTH,
            known_sign_width_m: crate::distance::DEFAULT_KNOWN_WIDTH_M,
            phrases: UtterancePools::default(),
        }
    }
}

impl Settings {
    /// Load settings from `.robin/config.toml` under the current working
    /// directory, falling back to defaults when the file is absent.
    pub fn load() -> Result<Self> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::load_from(&cwd)
    }

    /// Load settings from `<base>/.robin/config.toml`.
    pub fn load_from(base: &Path) -> Result<Self> {
        let path = base.join(ROBIN_DIR).join(CONFIG_FILENAME);
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let settings: Settings = toml::from_str(&raw).map_err(|e| Error::ConfigInvalid {
            message: format!("{}: {}", path.display(), e),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(Error::ConfigInvalid {
                message: format!("threshold must be in [0, 1], got {}", self.threshold),
            });
        }
        if self.phrases.alerts.is_empty() {
            return Err(Error::ConfigInvalid {
                message: "phrases.alerts must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
