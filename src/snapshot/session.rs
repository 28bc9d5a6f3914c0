//! The stereo snapshot control loop.

use chrono::NaiveDateTime;
use std::path::PathBuf;
use std::time::Duration;

use super::storage::{ensure_directory, save_image, snapshot_dir, snapshot_path};
use super::{Clock, Side, SnapshotConfig};
use crate::capture::{CaptureBackend, CaptureError, Frame, FrameSource, PipelineConfig};
use crate::preview::{Display, DisplayError, Key};

/// Paths written by one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPair {
    /// Image from the right-hand camera.
    pub right: PathBuf,
    /// Image from the left-hand camera.
    pub left: PathBuf,
}

/// Result of one loop iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Both frames were shown.
    Continue,
    /// Both frames were shown and written to disk.
    Saved(SavedPair),
    /// A read failed; nothing was shown this iteration.
    Skipped,
    /// A window was closed or Escape was pressed.
    Stop,
}

/// Opens the right and left sources.
///
/// If either fails to open, both are released and the first failure is
/// returned.
pub fn open_pair(
    backend: &dyn CaptureBackend,
    right: &PipelineConfig,
    left: &PipelineConfig,
) -> Result<(Box<dyn FrameSource>, Box<dyn FrameSource>), CaptureError> {
    right.validate()?;
    left.validate()?;

    let right_descriptor = right.descriptor();
    let left_descriptor = left.descriptor();
    let mut right_source = backend.open(&right_descriptor, right);
    let mut left_source = backend.open(&left_descriptor, left);

    let failure = if !right_source.is_opened() {
        Some((right.sensor_id, right_descriptor))
    } else if !left_source.is_opened() {
        Some((left.sensor_id, left_descriptor))
    } else {
        None
    };

    match failure {
        None => Ok((right_source, left_source)),
        Some((sensor_id, descriptor)) => {
            right_source.release();
            left_source.release();
            Err(CaptureError::Open {
                sensor_id,
                descriptor: descriptor.to_string(),
            })
        }
    }
}

/// Previews both cameras and saves a pair of images every interval.
pub struct SnapshotSession<C: Clock> {
    right: Box<dyn FrameSource>,
    left: Box<dyn FrameSource>,
    display: Box<dyn Display>,
    clock: C,
    config: SnapshotConfig,
    interval: Duration,
    last_save: Duration,
    pairs_saved: u64,
}

impl<C: Clock> SnapshotSession<C> {
    /// Creates both windows and starts the snapshot timer.
    pub fn new(
        right: Box<dyn FrameSource>,
        left: Box<dyn FrameSource>,
        mut display: Box<dyn Display>,
        clock: C,
        config: SnapshotConfig,
    ) -> Result<Self, DisplayError> {
        display.create_window(&config.right_window)?;
        display.create_window(&config.left_window)?;

        let interval = Duration::try_from_secs_f64(config.interval_secs).unwrap_or_default();
        let last_save = clock.elapsed();
        tracing::info!(
            output_dir = %config.output_dir.display(),
            interval_secs = config.interval_secs,
            "Snapshot session started"
        );

        Ok(Self {
            right,
            left,
            display,
            clock,
            config,
            interval,
            last_save,
            pairs_saved: 0,
        })
    }

    /// Number of image pairs written so far.
    pub fn pairs_saved(&self) -> u64 {
        self.pairs_saved
    }

    /// Runs one iteration of the loop.
    pub fn step(&mut self) -> StepOutcome {
        if !self.display.is_window_open(&self.config.right_window)
            || !self.display.is_window_open(&self.config.left_window)
        {
            tracing::info!("Preview window closed");
            return StepOutcome::Stop;
        }

        let frames = self.read_pair();
        if let Some((right, left)) = &frames {
            for (window, frame) in [
                (&self.config.right_window, right),
                (&self.config.left_window, left),
            ] {
                if let Err(e) = self.display.show(window, frame) {
                    tracing::warn!(error = %e, "Failed to show frame");
                }
            }
        }

        let poll = Duration::from_millis(self.config.key_poll_ms);
        if self.display.poll_key(poll) == Some(Key::ESCAPE) {
            tracing::info!("Escape pressed");
            return StepOutcome::Stop;
        }

        let Some((right, left)) = frames else {
            return StepOutcome::Skipped;
        };

        let elapsed = self.clock.elapsed();
        if elapsed.saturating_sub(self.last_save) < self.interval {
            return StepOutcome::Continue;
        }
        self.last_save = elapsed;

        match self.save_pair(&right, &left, self.clock.now()) {
            Some(pair) => {
                self.pairs_saved += 1;
                StepOutcome::Saved(pair)
            }
            None => StepOutcome::Continue,
        }
    }

    /// Loops until a window is closed or Escape is pressed, then releases
    /// both sources and destroys the windows. Returns the pairs saved.
    pub fn run(mut self) -> u64 {
        while self.step() != StepOutcome::Stop {}

        self.right.release();
        self.left.release();
        self.display.destroy_all();
        tracing::info!(pairs_saved = self.pairs_saved, "Snapshot session ended");
        self.pairs_saved
    }

    fn read_pair(&mut self) -> Option<(Frame, Frame)> {
        let right = self.right.read();
        let left = self.left.read();
        match (right, left) {
            (Ok(right), Ok(left)) if self.config.rotate_180 => {
                Some((right.rotated_180(), left.rotated_180()))
            }
            (Ok(right), Ok(left)) => Some((right, left)),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "Skipping iteration after failed read");
                None
            }
        }
    }

    fn save_pair(&self, right: &Frame, left: &Frame, at: NaiveDateTime) -> Option<SavedPair> {
        let root = &self.config.output_dir;
        let mut written = Vec::with_capacity(2);

        for (side, frame) in [(Side::Right, right), (Side::Left, left)] {
            let dir = snapshot_dir(root, side, at);
            ensure_directory(&dir);
            let path = snapshot_path(root, side, at);
            match save_image(&path, frame) {
                Ok(()) => {
                    tracing::info!(path = %path.display(), "Snapshot written");
                    written.push(path);
                }
                Err(e) => tracing::error!(error = %e, "Snapshot not written"),
            }
        }

        let left = written.pop()?;
        let right = written.pop()?;
        Some(SavedPair { right, left })
    }
}
