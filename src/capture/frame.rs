//! Frame type representing a captured BGR image with metadata.

use image::RgbImage;
use std::sync::Arc;
use std::time::Instant;

/// Bytes per pixel of the fixed BGR layout.
pub const CHANNELS: usize = 3;

/// A frame shared between every consumer of one capture iteration.
pub type SharedFrame = Arc<Frame>;

/// A single captured frame.
///
/// Pixels are stored row-major in BGR order, which is what the capture
/// pipeline's `appsink` produces.
#[derive(Clone)]
pub struct Frame {
    /// Raw BGR pixel data.
    pixels: Vec<u8>,
    /// Frame width in pixels.
    width: u32,
    /// Frame height in pixels.
    height: u32,
    /// Capture timestamp.
    timestamp: Instant,
    /// Monotonic sequence number assigned by the source.
    sequence: u64,
}

impl Frame {
    /// Creates a new frame with the given parameters.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Self {
            pixels,
            width,
            height,
            timestamp: Instant::now(),
            sequence,
        }
    }

    /// Creates a frame filled with a single BGR color.
    pub fn filled(width: u32, height: u32, bgr: [u8; 3], sequence: u64) -> Self {
        let pixels = bgr
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * CHANNELS)
            .collect();
        Self::new(pixels, width, height, sequence)
    }

    /// Returns a reference to the raw BGR pixel data.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns the frame width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the frame height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the capture timestamp.
    #[inline]
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Returns the sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Validates that the pixel buffer size matches dimensions.
    pub fn is_valid(&self) -> bool {
        self.pixels.len() == self.pixel_count() * CHANNELS
    }

    /// Returns the BGR value at `(x, y)`, or `None` if out of bounds.
    pub fn pixel_at(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * CHANNELS;
        let px = self.pixels.get(offset..offset + CHANNELS)?;
        Some([px[0], px[1], px[2]])
    }

    /// Returns a copy of this frame rotated by 180 degrees.
    ///
    /// The CSI modules on the stereo carrier are mounted upside down.
    pub fn rotated_180(&self) -> Frame {
        let mut pixels = Vec::with_capacity(self.pixels.len());
        for px in self.pixels.chunks_exact(CHANNELS).rev() {
            pixels.extend_from_slice(px);
        }
        Frame {
            pixels,
            width: self.width,
            height: self.height,
            timestamp: self.timestamp,
            sequence: self.sequence,
        }
    }

    /// Converts the frame into an RGB image for encoding.
    ///
    /// Returns `None` if the buffer does not match the dimensions.
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        if !self.is_valid() {
            return None;
        }
        let mut rgb = Vec::with_capacity(self.pixels.len());
        for px in self.pixels.chunks_exact(CHANNELS) {
            rgb.extend_from_slice(&[px[2], px[1], px[0]]);
        }
        RgbImage::from_raw(self.width, self.height, rgb)
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}
