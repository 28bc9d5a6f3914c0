//! Display surface abstraction.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::capture::Frame;

/// Errors raised by a display backend.
#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("failed to create window `{0}`: {1}")]
    CreateWindow(String, String),
    #[error("failed to show frame in `{0}`: {1}")]
    Show(String, String),
    #[error("frame buffer does not match {width}x{height}")]
    InvalidFrame { width: u32, height: u32 },
}

/// Key code reported by [`Display::poll_key`], masked to its low byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Key(pub u8);

impl Key {
    /// The Escape key, which ends previews and the snapshot loop.
    pub const ESCAPE: Key = Key(27);

    /// Builds a key from a raw window-system code.
    pub fn from_code(code: i32) -> Self {
        Key((code & 0xFF) as u8)
    }
}

/// Named on-screen surfaces that frames are rendered into.
pub trait Display: Send {
    /// Creates (or reuses) a window.
    fn create_window(&mut self, name: &str) -> Result<(), DisplayError>;

    /// Renders a frame into a window.
    fn show(&mut self, name: &str, frame: &Frame) -> Result<(), DisplayError>;

    /// Pumps window events for up to `timeout` and returns a pressed key.
    fn poll_key(&mut self, timeout: Duration) -> Option<Key>;

    /// Checks whether the user has not closed the window.
    fn is_window_open(&self, name: &str) -> bool;

    /// Destroys one window.
    fn destroy_window(&mut self, name: &str);

    /// Destroys every window.
    fn destroy_all(&mut self);
}

#[derive(Default)]
struct HeadlessState {
    windows: Mutex<HashSet<String>>,
    frames_shown: AtomicU64,
    cancelled: AtomicBool,
}

/// Display without a window system.
///
/// Windows are tracked by name only. `poll_key` sleeps for its timeout and
/// reports Escape once the cancel flag is raised (for example from a
/// Ctrl-C handler), which gives headless runs the same exit path as a
/// key press.
pub struct HeadlessDisplay {
    state: Arc<HeadlessState>,
    cancel: Arc<AtomicBool>,
}

/// Observer and remote control for a [`HeadlessDisplay`].
#[derive(Clone)]
pub struct HeadlessHandle {
    state: Arc<HeadlessState>,
}

impl HeadlessDisplay {
    /// Creates a display that reports Escape once `cancel` is set.
    pub fn new(cancel: Arc<AtomicBool>) -> Self {
        Self {
            state: Arc::new(HeadlessState::default()),
            cancel,
        }
    }

    /// Returns a handle for observing the display from another thread.
    pub fn handle(&self) -> HeadlessHandle {
        HeadlessHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for HeadlessDisplay {
    fn default() -> Self {
        Self::new(Arc::new(AtomicBool::new(false)))
    }
}

impl Display for HeadlessDisplay {
    fn create_window(&mut self, name: &str) -> Result<(), DisplayError> {
        if self.state.windows.lock().insert(name.to_string()) {
            tracing::debug!(window = name, "Headless window created");
        }
        Ok(())
    }

    fn show(&mut self, name: &str, frame: &Frame) -> Result<(), DisplayError> {
        if !frame.is_valid() {
            return Err(DisplayError::InvalidFrame {
                width: frame.width(),
                height: frame.height(),
            });
        }
        self.state.windows.lock().insert(name.to_string());
        let shown = self.state.frames_shown.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!(window = name, sequence = frame.sequence(), shown, "Frame shown");
        Ok(())
    }

    fn poll_key(&mut self, timeout: Duration) -> Option<Key> {
        if self.cancel.load(Ordering::SeqCst) || self.state.cancelled.load(Ordering::SeqCst) {
            return Some(Key::ESCAPE);
        }
        std::thread::sleep(timeout);
        None
    }

    fn is_window_open(&self, name: &str) -> bool {
        self.state.windows.lock().contains(name)
    }

    fn destroy_window(&mut self, name: &str) {
        if self.state.windows.lock().remove(name) {
            tracing::debug!(window = name, "Headless window destroyed");
        }
    }

    fn destroy_all(&mut self) {
        self.state.windows.lock().clear();
    }
}

/// Wraps a display so that raising `cancel` reads as an Escape key press.
///
/// Installing a Ctrl-C handler replaces the default SIGINT exit, so every
/// display the binaries use must observe the flag to stay interruptible.
pub struct Interruptible<D> {
    inner: D,
    cancel: Arc<AtomicBool>,
}

impl<D: Display> Interruptible<D> {
    /// Wraps `inner`, reporting Escape once `cancel` is set.
    pub fn new(inner: D, cancel: Arc<AtomicBool>) -> Self {
        Self { inner, cancel }
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

impl<D: Display> Display for Interruptible<D> {
    fn create_window(&mut self, name: &str) -> Result<(), DisplayError> {
        self.inner.create_window(name)
    }

    fn show(&mut self, name: &str, frame: &Frame) -> Result<(), DisplayError> {
        self.inner.show(name, frame)
    }

    fn poll_key(&mut self, timeout: Duration) -> Option<Key> {
        if self.cancelled() {
            return Some(Key::ESCAPE);
        }
        match self.inner.poll_key(timeout) {
            None if self.cancelled() => Some(Key::ESCAPE),
            key => key,
        }
    }

    fn is_window_open(&self, name: &str) -> bool {
        self.inner.is_window_open(name)
    }

    fn destroy_window(&mut self, name: &str) {
        self.inner.destroy_window(name)
    }

    fn destroy_all(&mut self) {
        self.inner.destroy_all()
    }
}

impl HeadlessHandle {
    /// Total frames rendered across all windows.
    pub fn frames_shown(&self) -> u64 {
        self.state.frames_shown.load(Ordering::Relaxed)
    }

    /// Whether a window with this name is currently open.
    pub fn is_window_open(&self, name: &str) -> bool {
        self.state.windows.lock().contains(name)
    }

    /// Simulates the user closing a window.
    pub fn close_window(&self, name: &str) {
        self.state.windows.lock().remove(name);
    }

    /// Simulates an Escape key press on the next poll.
    pub fn press_escape(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interruptible_reports_escape_once_cancelled() {
        let cancel = Arc::new(AtomicBool::new(false));
        let inner = HeadlessDisplay::default();
        let handle = inner.handle();
        let mut display = Interruptible::new(inner, Arc::clone(&cancel));

        display.create_window("Left Camera").unwrap();
        assert_eq!(display.poll_key(Duration::from_millis(1)), None);
        assert!(handle.is_window_open("Left Camera"));

        cancel.store(true, Ordering::SeqCst);
        assert_eq!(display.poll_key(Duration::from_millis(1)), Some(Key::ESCAPE));
    }

    #[test]
    fn test_key_masks_high_bits() {
        assert_eq!(Key::from_code(0x1_001B), Key::ESCAPE);
        assert_eq!(Key::from_code(-1), Key(0xFF));
    }

    #[test]
    fn test_headless_window_lifecycle() {
        let mut display = HeadlessDisplay::default();
        let handle = display.handle();

        display.create_window("Right Camera").unwrap();
        assert!(display.is_window_open("Right Camera"));

        display
            .show("Right Camera", &Frame::filled(2, 2, [0, 0, 0], 1))
            .unwrap();
        assert_eq!(handle.frames_shown(), 1);

        handle.close_window("Right Camera");
        assert!(!display.is_window_open("Right Camera"));
    }

    #[test]
    fn test_headless_rejects_invalid_frame() {
        let mut display = HeadlessDisplay::default();
        let result = display.show("w", &Frame::new(vec![0; 5], 2, 2, 1));
        assert!(matches!(result, Err(DisplayError::InvalidFrame { .. })));
    }

    #[test]
    fn test_cancel_flag_reports_escape() {
        let cancel = Arc::new(AtomicBool::new(false));
        let mut display = HeadlessDisplay::new(Arc::clone(&cancel));

        assert_eq!(display.poll_key(Duration::from_millis(1)), None);
        cancel.store(true, Ordering::SeqCst);
        assert_eq!(display.poll_key(Duration::from_millis(1)), Some(Key::ESCAPE));
    }
}
