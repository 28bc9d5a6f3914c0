use std::time::Duration;
use thiserror::Error;

use super::config::ConfigError;

/// Errors that can occur during camera operations.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to open camera {sensor_id} with pipeline `{descriptor}`")]
    Open { sensor_id: u32, descriptor: String },
    #[error("failed to acquire frame: {0}")]
    AcquisitionFailed(String),
    #[error("no frame delivered within {0:?}")]
    Timeout(Duration),
    #[error("frame reader is stopped")]
    Stopped,
    #[error("failed to spawn background thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl CaptureError {
    /// Copies the error for fan-out to several waiting consumers.
    ///
    /// Only variants the reader delivers through mailboxes are reproduced
    /// exactly; anything else collapses into `AcquisitionFailed`.
    pub(crate) fn duplicate(&self) -> Self {
        match self {
            Self::AcquisitionFailed(msg) => Self::AcquisitionFailed(msg.clone()),
            Self::Timeout(after) => Self::Timeout(*after),
            Self::Stopped => Self::Stopped,
            other => Self::AcquisitionFailed(other.to_string()),
        }
    }
}
