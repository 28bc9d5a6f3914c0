//! GStreamer capture through OpenCV's `videoio`.

use opencv::core::{Mat, CV_8UC3};
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture};

use super::config::{PipelineConfig, PipelineDescriptor};
use super::error::CaptureError;
use super::frame::Frame;
use super::source::{CaptureBackend, FrameSource};

/// Capture handle backed by `cv::VideoCapture` with `CAP_GSTREAMER`.
pub struct OpenCvSource {
    capture: Option<VideoCapture>,
    sequence: u64,
}

impl OpenCvSource {
    /// Opens the pipeline. A failed open yields a source whose
    /// [`FrameSource::is_opened`] is false.
    pub fn open(descriptor: &PipelineDescriptor) -> Self {
        let capture = match VideoCapture::from_file(descriptor.as_str(), videoio::CAP_GSTREAMER) {
            Ok(capture) => Some(capture),
            Err(e) => {
                tracing::warn!(error = %e, "VideoCapture construction failed");
                None
            }
        };
        Self {
            capture,
            sequence: 0,
        }
    }
}

impl FrameSource for OpenCvSource {
    fn is_opened(&self) -> bool {
        self.capture
            .as_ref()
            .map(|c| c.is_opened().unwrap_or(false))
            .unwrap_or(false)
    }

    fn read(&mut self) -> Result<Frame, CaptureError> {
        let capture = self
            .capture
            .as_mut()
            .ok_or_else(|| CaptureError::AcquisitionFailed("capture not open".to_string()))?;

        let mut mat = Mat::default();
        let grabbed = capture
            .read(&mut mat)
            .map_err(|e| CaptureError::AcquisitionFailed(e.to_string()))?;
        if !grabbed || mat.empty() {
            return Err(CaptureError::AcquisitionFailed(
                "pipeline returned no frame".to_string(),
            ));
        }
        if mat.typ() != CV_8UC3 {
            return Err(CaptureError::AcquisitionFailed(format!(
                "unexpected frame type {}",
                mat.typ()
            )));
        }

        let mat = if mat.is_continuous() {
            mat
        } else {
            mat.try_clone()
                .map_err(|e| CaptureError::AcquisitionFailed(e.to_string()))?
        };
        let pixels = mat
            .data_bytes()
            .map_err(|e| CaptureError::AcquisitionFailed(e.to_string()))?
            .to_vec();

        self.sequence += 1;
        Ok(Frame::new(
            pixels,
            mat.cols() as u32,
            mat.rows() as u32,
            self.sequence,
        ))
    }

    fn release(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            if let Err(e) = capture.release() {
                tracing::warn!(error = %e, "VideoCapture release failed");
            }
        }
    }
}

/// Backend that opens [`OpenCvSource`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenCvBackend;

impl CaptureBackend for OpenCvBackend {
    fn open(
        &self,
        descriptor: &PipelineDescriptor,
        config: &PipelineConfig,
    ) -> Box<dyn FrameSource> {
        tracing::info!(sensor_id = config.sensor_id, %descriptor, "Opening capture pipeline");
        Box::new(OpenCvSource::open(descriptor))
    }
}
