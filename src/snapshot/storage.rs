//! Snapshot files on disk.
//!
//! Images land under `<root>/<Right|Left>/<YYYY-MM-DD>/<HH:MM:SS>.png`.

use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::Side;
use crate::capture::Frame;

/// Errors that can occur while persisting snapshots.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("frame buffer does not match {width}x{height}")]
    InvalidFrame { width: u32, height: u32 },
    #[error("failed to write {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Creates `path` and its parents if missing.
///
/// Failure is logged and reported as `false`; callers carry on.
pub fn ensure_directory(path: &Path) -> bool {
    match try_ensure_directory(path) {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "Error creating directory");
            false
        }
    }
}

fn try_ensure_directory(path: &Path) -> Result<(), StorageError> {
    if path.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(path).map_err(|source| StorageError::CreateDirectory {
        path: path.to_path_buf(),
        source,
    })
}

/// Encodes the frame as PNG at `path`.
pub fn save_image(path: &Path, frame: &Frame) -> Result<(), StorageError> {
    let image = frame.to_rgb_image().ok_or(StorageError::InvalidFrame {
        width: frame.width(),
        height: frame.height(),
    })?;
    image
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|source| StorageError::Encode {
            path: path.to_path_buf(),
            source,
        })
}

/// Directory holding one side's snapshots for the day of `at`.
pub fn snapshot_dir(root: &Path, side: Side, at: NaiveDateTime) -> PathBuf {
    root.join(side.dir_name())
        .join(at.format("%Y-%m-%d").to_string())
}

/// Full path of one side's snapshot taken at `at`.
pub fn snapshot_path(root: &Path, side: Side, at: NaiveDateTime) -> PathBuf {
    snapshot_dir(root, side, at).join(format!("{}.png", at.format("%H:%M:%S")))
}
