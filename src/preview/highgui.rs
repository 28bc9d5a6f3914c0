//! On-screen display through OpenCV's `highgui`.

use opencv::core::{Mat, CV_8UC3};
use opencv::highgui;
use opencv::prelude::*;
use std::time::Duration;

use super::display::{Display, DisplayError, Key};
use crate::capture::Frame;

/// Windows managed by `cv::highgui`.
#[derive(Debug, Default)]
pub struct HighGuiDisplay;

impl HighGuiDisplay {
    /// Creates a handle to the process-wide highgui window system.
    pub fn new() -> Self {
        Self
    }
}

fn to_mat(frame: &Frame) -> Result<Mat, opencv::Error> {
    let mut mat = Mat::new_rows_cols_with_default(
        frame.height() as i32,
        frame.width() as i32,
        CV_8UC3,
        opencv::core::Scalar::all(0.0),
    )?;
    mat.data_bytes_mut()?.copy_from_slice(frame.pixels());
    Ok(mat)
}

impl Display for HighGuiDisplay {
    fn create_window(&mut self, name: &str) -> Result<(), DisplayError> {
        highgui::named_window(name, highgui::WINDOW_AUTOSIZE)
            .map_err(|e| DisplayError::CreateWindow(name.to_string(), e.to_string()))
    }

    fn show(&mut self, name: &str, frame: &Frame) -> Result<(), DisplayError> {
        if !frame.is_valid() {
            return Err(DisplayError::InvalidFrame {
                width: frame.width(),
                height: frame.height(),
            });
        }
        let mat = to_mat(frame).map_err(|e| DisplayError::Show(name.to_string(), e.to_string()))?;
        highgui::imshow(name, &mat).map_err(|e| DisplayError::Show(name.to_string(), e.to_string()))
    }

    fn poll_key(&mut self, timeout: Duration) -> Option<Key> {
        let millis = timeout.as_millis().clamp(1, i32::MAX as u128) as i32;
        match highgui::wait_key(millis) {
            Ok(code) if code >= 0 => Some(Key::from_code(code)),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "waitKey failed");
                None
            }
        }
    }

    fn is_window_open(&self, name: &str) -> bool {
        highgui::get_window_property(name, highgui::WND_PROP_AUTOSIZE)
            .map(|value| value >= 0.0)
            .unwrap_or(false)
    }

    fn destroy_window(&mut self, name: &str) {
        if let Err(e) = highgui::destroy_window(name) {
            tracing::debug!(window = name, error = %e, "destroyWindow failed");
        }
    }

    fn destroy_all(&mut self) {
        if let Err(e) = highgui::destroy_all_windows() {
            tracing::debug!(error = %e, "destroyAllWindows failed");
        }
    }
}
