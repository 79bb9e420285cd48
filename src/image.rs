// image.rs — Host-side pixel buffer, interleaved u8 channels.
//
// One type covers both ends of the pipeline:
//   input  — 3 (RGB) or 4 (RGBA) channels, straight from the decoder
//   output — 1 channel (luminance), straight from GPU read-back
//
// Memory layout (width = 2, channels = 3):
//
//   data index:  0 1 2  3 4 5  6 7 8  9 10 11
//   channel:     R G B  R G B  R G B  R G  B
//   pixel:       (0,0)  (1,0)  (0,1)  (1,1)
//
// No stride padding: rows are packed back to back. The GPU side reads the
// buffer as an array of u32 words, so the upload pads the *tail* to a
// multiple of four bytes, never individual rows.

use std::fmt;

/// A row-major image with `channels` interleaved bytes per pixel.
///
/// Width, height and channel count are fixed at construction. The data
/// length always equals `width * height * channels`.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

impl PixelBuffer {
    /// Wrap an existing byte vector.
    ///
    /// # Panics
    /// If either dimension is zero, `channels` is not in `1..=4`, or
    /// `data.len() != width * height * channels`.
    pub fn from_vec(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Self {
        assert!(width > 0 && height > 0, "image dimensions must be nonzero");
        assert!((1..=4).contains(&channels), "channels must be 1..=4 (got {channels})");
        let expected = width as usize * height as usize * channels as usize;
        assert_eq!(
            data.len(),
            expected,
            "data length {} does not match {width}×{height}×{channels}",
            data.len()
        );
        PixelBuffer { data, width, height, channels }
    }

    /// Zero-filled buffer.
    pub fn new(width: u32, height: u32, channels: u8) -> Self {
        let len = width as usize * height as usize * channels as usize;
        Self::from_vec(width, height, channels, vec![0; len])
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Number of pixels (width × height), independent of channel count.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Raw interleaved bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Channel values of the pixel at (x, y).
    ///
    /// # Panics
    /// If (x, y) lies outside the image.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        let start = self.offset(x, y);
        &self.data[start..start + self.channels as usize]
    }

    /// Overwrite the pixel at (x, y). `value` must hold `channels` bytes.
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, value: &[u8]) {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        assert_eq!(value.len(), self.channels as usize);
        let start = self.offset(x, y);
        self.data[start..start + value.len()].copy_from_slice(value);
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * self.channels as usize
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The pixel data can be megabytes; print only the shape.
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .finish()
    }
}

impl fmt::Display for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{}×{}", self.width, self.height, self.channels)
    }
}
