//! Camera input and frame handling.
//!
//! This module provides the capture pipeline description, the frame type
//! and the frame source abstraction the rest of the crate reads from.

mod config;
mod error;
mod frame;
#[cfg(feature = "opencv")]
mod videoio;
mod source;

pub use config::{ConfigError, FileConfig, PipelineConfig, PipelineDescriptor};
pub use error::CaptureError;
pub use frame::{Frame, SharedFrame, CHANNELS};
#[cfg(feature = "opencv")]
pub use videoio::{OpenCvBackend, OpenCvSource};
pub use source::{
    CaptureBackend, FrameSource, MockFeeder, MockSource, SyntheticBackend, SyntheticSource,
};

/// Returns the backend compiled into this build.
///
/// With the `opencv` feature this is the GStreamer pipeline through
/// OpenCV; otherwise the synthetic test pattern.
pub fn default_backend() -> Box<dyn CaptureBackend> {
    #[cfg(feature = "opencv")]
    {
        Box::new(OpenCvBackend)
    }
    #[cfg(not(feature = "opencv"))]
    {
        tracing::warn!("built without the `opencv` feature, using synthetic frames");
        Box::new(SyntheticBackend)
    }
}
