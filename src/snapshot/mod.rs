//! Stereo preview with periodic snapshots.
//!
//! Reads the right and left sensors synchronously on the caller's thread,
//! shows both upright, and every interval writes both frames to
//! date-stamped folders.

mod clock;
mod session;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use session::{open_pair, SavedPair, SnapshotSession, StepOutcome};
pub use storage::{ensure_directory, save_image, snapshot_path, StorageError};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::capture::ConfigError;

/// Which camera of the stereo pair a snapshot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Sensor 0, shown in "Right Camera".
    Right,
    /// Sensor 1, shown in "Left Camera".
    Left,
}

impl Side {
    /// Folder name under the snapshot root.
    pub fn dir_name(self) -> &'static str {
        match self {
            Side::Right => "Right",
            Side::Left => "Left",
        }
    }
}

/// Snapshot loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Root folder for saved images.
    pub output_dir: PathBuf,
    /// Seconds between saved pairs.
    pub interval_secs: f64,
    /// Key poll interval per iteration, in milliseconds.
    pub key_poll_ms: u64,
    /// Rotate frames by 180 degrees before showing and saving them.
    pub rotate_180: bool,
    /// Title of the right camera's window.
    pub right_window: String,
    /// Title of the left camera's window.
    pub left_window: String,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("images"),
            interval_secs: 5.0,
            key_poll_ms: 30,
            rotate_180: true,
            right_window: "Right Camera".to_string(),
            left_window: "Left Camera".to_string(),
        }
    }
}

impl SnapshotConfig {
    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.interval_secs.is_finite() || self.interval_secs <= 0.0 {
            return Err(ConfigError::InvalidInterval("interval_secs must be positive"));
        }
        if self.key_poll_ms == 0 {
            return Err(ConfigError::InvalidInterval("key_poll_ms must be positive"));
        }
        Ok(())
    }
}
