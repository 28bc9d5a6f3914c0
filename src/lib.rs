//! CSI Camera Capture Library
//!
//! Camera management for dual CSI sensor boards (Jetson Nano class): a
//! background frame reader with one-shot mailbox delivery, an optional
//! on-screen previewer, and a stereo snapshot loop that periodically saves
//! image pairs.
//!
//! # Architecture
//!
//! ```text
//! FrameSource ─► FrameReader ─► mailboxes ─► Camera::get_frame
//!                                        └─► Previewer ─► Display
//!
//! FrameSource ×2 ─► SnapshotSession ─► Display + images/<side>/<date>/<time>.png
//! ```
//!
//! Each capture iteration performs one blocking read and delivers the same
//! frame to every consumer waiting at that moment. Consumers arriving later
//! wait for the next iteration.
//!
//! # Example
//!
//! ```no_run
//! use csi_camera::{Camera, PreviewConfig, HeadlessDisplay};
//! use std::time::Duration;
//!
//! let mut camera = Camera::open(0).unwrap();
//! camera
//!     .start_preview(Box::new(HeadlessDisplay::default()), PreviewConfig::default())
//!     .unwrap();
//!
//! let frame = camera.get_frame().unwrap();
//! println!("{}x{}", frame.width(), frame.height());
//!
//! std::thread::sleep(Duration::from_secs(1));
//! camera.stop_preview();
//! camera.close();
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod camera;
pub mod capture;
pub mod preview;
pub mod reader;
pub mod snapshot;

// Re-export commonly used types at crate root
pub use camera::Camera;
pub use capture::{
    CaptureBackend, CaptureError, FileConfig, Frame, FrameSource, PipelineConfig, SharedFrame,
};
pub use preview::{Display, HeadlessDisplay, PreviewConfig, Previewer};
pub use reader::{FrameReader, FrameRequester, ReaderConfig};
pub use snapshot::{SnapshotConfig, SnapshotSession, StepOutcome};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
