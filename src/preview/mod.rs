//! On-screen preview.
//!
//! A [`Previewer`] repeatedly requests frames from a reader and renders
//! them through a [`Display`]. The key poll after each frame is a display
//! refresh throttle, not a frame-rate guarantee.

mod display;
#[cfg(feature = "opencv")]
mod highgui;
mod previewer;

pub use display::{Display, DisplayError, HeadlessDisplay, HeadlessHandle, Interruptible, Key};
#[cfg(feature = "opencv")]
pub use self::highgui::HighGuiDisplay;
pub use previewer::Previewer;

use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::capture::ConfigError;

/// Preview window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Name of the preview window.
    pub window_name: String,
    /// How long to wait for each frame, in milliseconds.
    pub frame_timeout_ms: u64,
    /// Key poll interval after each frame, in milliseconds.
    pub poll_interval_ms: u64,
    /// End the preview when Escape is pressed in its window.
    pub exit_on_escape: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            window_name: "Arducam".to_string(),
            frame_timeout_ms: 2000,
            poll_interval_ms: 16,
            exit_on_escape: true,
        }
    }
}

impl PreviewConfig {
    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_timeout_ms == 0 {
            return Err(ConfigError::InvalidInterval("frame_timeout_ms must be positive"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidInterval("poll_interval_ms must be positive"));
        }
        Ok(())
    }
}

/// Returns the display compiled into this build.
///
/// With the `opencv` feature this opens real windows; otherwise a
/// [`HeadlessDisplay`]. Either way `cancel` reads as an Escape key press.
pub fn default_display(cancel: Arc<AtomicBool>) -> Box<dyn Display> {
    #[cfg(feature = "opencv")]
    {
        Box::new(Interruptible::new(HighGuiDisplay::new(), cancel))
    }
    #[cfg(not(feature = "opencv"))]
    {
        Box::new(HeadlessDisplay::new(cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{Frame, MockSource};
    use crate::reader::{FrameReader, ReaderConfig};
    use std::time::{Duration, Instant};

    fn fast_config() -> PreviewConfig {
        PreviewConfig {
            window_name: "test-preview".to_string(),
            frame_timeout_ms: 20,
            poll_interval_ms: 1,
            exit_on_escape: true,
        }
    }

    fn wait_until(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_default_config_valid() {
        assert!(PreviewConfig::default().validate().is_ok());
        let config = PreviewConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_preview_retries_after_timeout() {
        let (source, feeder) = MockSource::new();
        let reader = FrameReader::spawn("preview", Box::new(source), ReaderConfig::default()).unwrap();
        let display = HeadlessDisplay::default();
        let handle = display.handle();

        let previewer = Previewer::start(reader.requester(), Box::new(display), fast_config()).unwrap();
        wait_until(|| handle.is_window_open("test-preview"));

        // Several 20ms frame timeouts elapse with nothing captured.
        std::thread::sleep(Duration::from_millis(100));
        assert!(previewer.is_running());
        assert_eq!(handle.frames_shown(), 0);

        // Frames pushed while the previewer sits between requests reach
        // nobody, so keep feeding until one is rendered.
        let mut sequence = 0;
        wait_until(|| {
            sequence += 1;
            feeder.push(Frame::filled(4, 4, [9, 9, 9], sequence));
            std::thread::sleep(Duration::from_millis(5));
            handle.frames_shown() >= 1
        });

        previewer.stop();
        assert!(!handle.is_window_open("test-preview"));

        drop(feeder);
        reader.join();
    }

    #[test]
    fn test_preview_ends_when_reader_stops() {
        let (source, feeder) = MockSource::new();
        let reader = FrameReader::spawn("preview", Box::new(source), ReaderConfig::default()).unwrap();
        let display = HeadlessDisplay::default();
        let handle = display.handle();

        let previewer = Previewer::start(reader.requester(), Box::new(display), fast_config()).unwrap();
        wait_until(|| handle.is_window_open("test-preview"));

        reader.stop();
        wait_until(|| !previewer.is_running());
        assert!(!handle.is_window_open("test-preview"));

        previewer.stop();
        drop(feeder);
        reader.join();
    }

    #[test]
    fn test_escape_ends_preview() {
        let (source, feeder) = MockSource::new();
        let reader = FrameReader::spawn("preview", Box::new(source), ReaderConfig::default()).unwrap();
        let display = HeadlessDisplay::default();
        let handle = display.handle();

        let previewer = Previewer::start(reader.requester(), Box::new(display), fast_config()).unwrap();
        handle.press_escape();

        wait_until(|| !previewer.is_running());
        previewer.stop();

        drop(feeder);
        reader.join();
    }
}
