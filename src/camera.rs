//! Camera handle.
//!
//! A [`Camera`] owns the capture pipeline for one CSI sensor through its
//! [`FrameReader`], and optionally a [`Previewer`] rendering that sensor.

use std::time::Duration;

use crate::capture::{
    default_backend, CaptureBackend, CaptureError, FrameSource, PipelineConfig, SharedFrame,
};
use crate::preview::{Display, PreviewConfig, Previewer};
use crate::reader::{FrameReader, FrameRequester, ReaderConfig};

/// An open camera with a running background reader.
pub struct Camera {
    sensor_id: u32,
    reader: Option<FrameReader>,
    previewer: Option<Previewer>,
}

impl Camera {
    /// Opens the sensor with the default pipeline and backend.
    pub fn open(sensor_id: u32) -> Result<Self, CaptureError> {
        let backend = default_backend();
        Self::open_with(
            backend.as_ref(),
            &PipelineConfig::for_sensor(sensor_id),
            ReaderConfig::default(),
        )
    }

    /// Opens a camera through an explicit backend and pipeline.
    pub fn open_with(
        backend: &dyn CaptureBackend,
        config: &PipelineConfig,
        reader_config: ReaderConfig,
    ) -> Result<Self, CaptureError> {
        config.validate()?;
        let descriptor = config.descriptor();
        let source = backend.open(&descriptor, config);
        if !source.is_opened() {
            return Err(CaptureError::Open {
                sensor_id: config.sensor_id,
                descriptor: descriptor.to_string(),
            });
        }
        Self::start(config.sensor_id, source, reader_config)
    }

    /// Wraps an already-constructed source.
    ///
    /// Fails with [`CaptureError::Open`] without starting a reader when the
    /// source reports it is not opened.
    pub fn from_source(
        sensor_id: u32,
        source: Box<dyn FrameSource>,
        reader_config: ReaderConfig,
    ) -> Result<Self, CaptureError> {
        if !source.is_opened() {
            return Err(CaptureError::Open {
                sensor_id,
                descriptor: String::from("<provided source>"),
            });
        }
        Self::start(sensor_id, source, reader_config)
    }

    fn start(
        sensor_id: u32,
        source: Box<dyn FrameSource>,
        reader_config: ReaderConfig,
    ) -> Result<Self, CaptureError> {
        let reader = FrameReader::spawn(&format!("sensor{sensor_id}"), source, reader_config)?;
        tracing::info!(sensor_id, "Camera opened");
        Ok(Self {
            sensor_id,
            reader: Some(reader),
            previewer: None,
        })
    }

    /// Returns the sensor id this camera was opened with.
    pub fn sensor_id(&self) -> u32 {
        self.sensor_id
    }

    fn reader(&self) -> Result<&FrameReader, CaptureError> {
        self.reader.as_ref().ok_or(CaptureError::Stopped)
    }

    /// Blocks until the next frame is captured.
    pub fn get_frame(&self) -> Result<SharedFrame, CaptureError> {
        self.reader()?.get_frame(None)
    }

    /// Waits up to `timeout` for the next frame.
    pub fn get_frame_timeout(&self, timeout: Duration) -> Result<SharedFrame, CaptureError> {
        self.reader()?.get_frame(Some(timeout))
    }

    /// Returns a handle for requesting frames from other threads.
    pub fn requester(&self) -> Result<FrameRequester, CaptureError> {
        Ok(self.reader()?.requester())
    }

    /// Starts previewing this camera in a window.
    pub fn start_preview(
        &mut self,
        display: Box<dyn Display>,
        config: PreviewConfig,
    ) -> Result<(), CaptureError> {
        if self.previewer.as_ref().is_some_and(Previewer::is_running) {
            tracing::warn!(sensor_id = self.sensor_id, "Preview already running");
            return Ok(());
        }
        // A previewer that ended on its own is joined before replacing it.
        if let Some(finished) = self.previewer.take() {
            finished.stop();
        }
        let requester = self.reader()?.requester();
        self.previewer = Some(Previewer::start(requester, display, config)?);
        Ok(())
    }

    /// Checks whether a preview is currently running.
    pub fn is_previewing(&self) -> bool {
        self.previewer.as_ref().is_some_and(Previewer::is_running)
    }

    /// Stops the preview and waits for its thread to finish.
    pub fn stop_preview(&mut self) {
        if let Some(previewer) = self.previewer.take() {
            previewer.stop();
        }
    }

    /// Stops the preview and reader and releases the capture pipeline.
    ///
    /// Returns once the read in flight has completed and the source is
    /// released.
    pub fn close(mut self) {
        self.stop_preview();
        if let Some(reader) = self.reader.take() {
            reader.join();
            tracing::info!(sensor_id = self.sensor_id, "Camera closed");
        }
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        // Without an explicit close the reader is only asked to stop; it
        // releases the source on its own once the read in flight returns.
        self.stop_preview();
        if let Some(reader) = self.reader.take() {
            reader.stop();
        }
    }
}
