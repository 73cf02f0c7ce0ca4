//! Frame acquisition boundary
//!
//! The camera is an external collaborator: the worker only needs a
//! blocking [`FrameSource`] that either yields a frame, fails
//! transiently (retry next iteration), or reports itself permanently
//! unavailable (fatal). [`DirectoryCamera`] is the prototype source,
//! replaying image files from a directory at roughly camera rate.

use std::path::PathBuf;
use std::time::Duration;

use robin_core::prelude::*;

/// A single captured frame.
pub type Frame = image::DynamicImage;

/// Blocking frame source.
///
/// `next_frame` failures split by severity: [`Error::FrameRead`] and
/// [`Error::FrameProcessing`] are per-frame (report and continue),
/// [`Error::CameraUnavailable`] is final.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Frame>;

    /// Release the underlying device. Idempotent; called on every worker
    /// exit path.
    fn close(&mut self) {}
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Prototype camera: cycles through the image files of a directory.
///
/// Pacing is simulated with a fixed inter-frame sleep so the loop runs
/// at roughly camera rate instead of spinning.
pub struct DirectoryCamera {
    dir: PathBuf,
    files: Vec<PathBuf>,
    cursor: usize,
    frame_interval: Duration,
    closed: bool,
}

impl DirectoryCamera {
    /// Open a frame directory. Fails with [`Error::CameraUnavailable`]
    /// when the directory is missing or holds no image files.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let entries = std::fs::read_dir(&dir).map_err(|e| {
            Error::camera_unavailable(format!("cannot open {}: {}", dir.display(), e))
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(Error::camera_unavailable(format!(
                "no image files in {}",
                dir.display()
            )));
        }

        info!(
            "Camera opened on {} ({} frames)",
            dir.display(),
            files.len()
        );

        Ok(Self {
            dir,
            files,
            cursor: 0,
            frame_interval: Duration::from_millis(33),
            closed: false,
        })
    }

    /// Override the simulated inter-frame delay.
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }
}

impl FrameSource for DirectoryCamera {
    fn next_frame(&mut self) -> Result<Frame> {
        if self.closed {
            return Err(Error::camera_unavailable("camera released"));
        }

        if !self.frame_interval.is_zero() {
            std::thread::sleep(self.frame_interval);
        }

        let path = self.files[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.files.len();

        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            // A vanished directory means the source is gone for good; a
            // single unreadable file is a transient capture failure.
            Err(_) if !self.dir.exists() => {
                return Err(Error::camera_unavailable(format!(
                    "{} disappeared",
                    self.dir.display()
                )))
            }
            Err(e) => {
                return Err(Error::frame_read(format!("{}: {}", path.display(), e)));
            }
        };

        image::load_from_memory(&bytes)
            .map_err(|e| Error::frame_processing(format!("{}: {}", path.display(), e)))
    }

    fn close(&mut self) {
        if !self.closed {
            debug!("Camera released");
            self.closed = true;
        }
    }
}
