//! Frame source abstraction.
//!
//! A frame source wraps a pipeline-backed capture handle. The trait lets
//! the reader and the snapshot loop run against real hardware, a synthetic
//! test pattern, or a test-controlled mock.

use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::config::{PipelineConfig, PipelineDescriptor};
use super::error::CaptureError;
use super::frame::{Frame, CHANNELS};

/// A pipeline-backed capture handle.
pub trait FrameSource: Send {
    /// Checks whether the pipeline was opened successfully.
    fn is_opened(&self) -> bool;

    /// Blocks until the next frame is available.
    fn read(&mut self) -> Result<Frame, CaptureError>;

    /// Releases the underlying pipeline.
    fn release(&mut self);
}

/// Opens frame sources from pipeline descriptors.
pub trait CaptureBackend {
    /// Opens a source for the descriptor.
    ///
    /// Opening never fails here; callers check [`FrameSource::is_opened`].
    fn open(
        &self,
        descriptor: &PipelineDescriptor,
        config: &PipelineConfig,
    ) -> Box<dyn FrameSource>;
}

/// Source producing a moving test pattern paced to the configured framerate.
#[derive(Debug)]
pub struct SyntheticSource {
    width: u32,
    height: u32,
    period: Duration,
    sequence: u64,
    next_due: Option<Instant>,
    released: bool,
}

impl SyntheticSource {
    /// Creates a test pattern paced at the configured frame rate.
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            width: config.display_width,
            height: config.display_height,
            period: Duration::from_secs(1) / config.framerate.max(1),
            sequence: 0,
            next_due: None,
            released: false,
        }
    }

    fn pattern(&self) -> Vec<u8> {
        let width = self.width as usize;
        let row_bytes = width * CHANNELS;
        let mut pixels = vec![0u8; row_bytes * self.height as usize];
        let shift = self.sequence as usize;
        for (y, row) in pixels.chunks_exact_mut(row_bytes).enumerate() {
            for (x, px) in row.chunks_exact_mut(CHANNELS).enumerate() {
                px[0] = ((x + shift) % 256) as u8;
                px[1] = ((y + shift) % 256) as u8;
                px[2] = ((x ^ y) % 256) as u8;
            }
        }
        pixels
    }
}

impl FrameSource for SyntheticSource {
    fn is_opened(&self) -> bool {
        !self.released
    }

    fn read(&mut self) -> Result<Frame, CaptureError> {
        if self.released {
            return Err(CaptureError::AcquisitionFailed(
                "synthetic source released".to_string(),
            ));
        }

        let now = Instant::now();
        if let Some(due) = self.next_due {
            if due > now {
                std::thread::sleep(due - now);
            }
        }
        self.next_due = Some(Instant::now() + self.period);

        self.sequence += 1;
        Ok(Frame::new(
            self.pattern(),
            self.width,
            self.height,
            self.sequence,
        ))
    }

    fn release(&mut self) {
        self.released = true;
    }
}

/// Backend that opens [`SyntheticSource`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyntheticBackend;

impl CaptureBackend for SyntheticBackend {
    fn open(
        &self,
        descriptor: &PipelineDescriptor,
        config: &PipelineConfig,
    ) -> Box<dyn FrameSource> {
        tracing::info!(
            sensor_id = config.sensor_id,
            %descriptor,
            "Opening synthetic source in place of capture pipeline"
        );
        Box::new(SyntheticSource::new(config))
    }
}

/// Test source fed frame by frame through a [`MockFeeder`].
///
/// `read` blocks until the feeder pushes a frame or a failure. Once the
/// feeder is dropped every read fails with `AcquisitionFailed`.
#[derive(Debug)]
pub struct MockSource {
    frames: Receiver<Result<Frame, String>>,
    opened: bool,
    released: Arc<AtomicBool>,
}

/// Feeding side of a [`MockSource`].
#[derive(Debug, Clone)]
pub struct MockFeeder {
    frames: Sender<Result<Frame, String>>,
    released: Arc<AtomicBool>,
}

impl MockSource {
    /// Creates an opened mock source and its feeder.
    pub fn new() -> (Self, MockFeeder) {
        Self::with_state(true)
    }

    /// Creates a mock source that reports it failed to open.
    pub fn closed() -> (Self, MockFeeder) {
        Self::with_state(false)
    }

    fn with_state(opened: bool) -> (Self, MockFeeder) {
        let (frame_tx, frame_rx) = crossbeam_channel::unbounded();
        let released = Arc::new(AtomicBool::new(false));
        (
            Self {
                frames: frame_rx,
                opened,
                released: Arc::clone(&released),
            },
            MockFeeder {
                frames: frame_tx,
                released,
            },
        )
    }
}

impl FrameSource for MockSource {
    fn is_opened(&self) -> bool {
        self.opened
    }

    fn read(&mut self) -> Result<Frame, CaptureError> {
        match self.frames.recv() {
            Ok(Ok(frame)) => Ok(frame),
            Ok(Err(reason)) => Err(CaptureError::AcquisitionFailed(reason)),
            Err(_) => Err(CaptureError::AcquisitionFailed(
                "mock feeder disconnected".to_string(),
            )),
        }
    }

    fn release(&mut self) {
        self.opened = false;
        self.released.store(true, Ordering::SeqCst);
    }
}

impl MockFeeder {
    /// Queues a frame for the next read. Returns false once the source is gone.
    pub fn push(&self, frame: Frame) -> bool {
        self.frames.send(Ok(frame)).is_ok()
    }

    /// Queues a failed read.
    pub fn fail(&self, reason: &str) -> bool {
        self.frames.send(Err(reason.to_string())).is_ok()
    }

    /// Checks whether the source has been released.
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Waits up to `timeout` for the source to be released.
    pub fn wait_released(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.is_released() {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        true
    }
}
