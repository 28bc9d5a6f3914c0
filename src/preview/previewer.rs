//! Live preview of a camera on a background thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use super::display::{Display, Key};
use super::PreviewConfig;
use crate::capture::CaptureError;
use crate::reader::FrameRequester;

/// Renders frames from a reader into a window until stopped.
pub struct Previewer {
    window_name: String,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Previewer {
    /// Starts the preview thread.
    pub fn start(
        frames: FrameRequester,
        display: Box<dyn Display>,
        config: PreviewConfig,
    ) -> Result<Self, CaptureError> {
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = Arc::clone(&running);
        let window_name = config.window_name.clone();

        let handle = std::thread::Builder::new()
            .name(format!("previewer-{window_name}"))
            .spawn(move || preview_loop(&frames, display, &config, &running_clone))
            .map_err(CaptureError::Spawn)?;

        tracing::info!(window = %window_name, "Preview started");

        Ok(Self {
            window_name,
            running,
            handle: Some(handle),
        })
    }

    /// Checks if the preview loop is still running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stops the preview and waits for its thread to finish.
    ///
    /// The loop exits after its current render step, at most one frame
    /// timeout later.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!(window = %self.window_name, "Preview thread panicked");
            }
            tracing::info!(window = %self.window_name, "Preview stopped");
        }
    }
}

impl Drop for Previewer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn preview_loop(
    frames: &FrameRequester,
    mut display: Box<dyn Display>,
    config: &PreviewConfig,
    running: &AtomicBool,
) {
    let window = config.window_name.as_str();
    let frame_timeout = Duration::from_millis(config.frame_timeout_ms);
    let poll_interval = Duration::from_millis(config.poll_interval_ms);

    if let Err(e) = display.create_window(window) {
        tracing::error!(error = %e, "Cannot open preview window");
        running.store(false, Ordering::SeqCst);
        return;
    }

    while running.load(Ordering::SeqCst) {
        match frames.get_frame(Some(frame_timeout)) {
            Ok(frame) => {
                if let Err(e) = display.show(window, &frame) {
                    tracing::warn!(window, error = %e, "Failed to render frame");
                }
            }
            Err(CaptureError::Stopped) => {
                tracing::info!(window, "Frame reader stopped, ending preview");
                break;
            }
            Err(e) => {
                // Timeouts and failed reads are transient; keep polling.
                tracing::warn!(window, error = %e, "No frame for preview");
            }
        }

        if display.poll_key(poll_interval) == Some(Key::ESCAPE) && config.exit_on_escape {
            tracing::info!(window, "Escape pressed, ending preview");
            break;
        }
    }

    display.destroy_window(window);
    running.store(false, Ordering::SeqCst);
}
