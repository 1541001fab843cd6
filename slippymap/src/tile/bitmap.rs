//! Decoded tile bitmaps.

use std::fmt;
use std::sync::Arc;

use image::RgbaImage;

/// A decoded tile bitmap.
///
/// Cloning is cheap: the pixel buffer is reference counted, so the cache and
/// every waiter of a coalesced load share one allocation.
#[derive(Clone)]
pub struct TileImage {
    pixels: Arc<RgbaImage>,
}

impl TileImage {
    /// Wrap an already decoded RGBA buffer.
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            pixels: Arc::new(pixels),
        }
    }

    /// Decode an encoded payload (PNG or JPEG).
    pub fn decode(bytes: &[u8]) -> Result<Self, image::ImageError> {
        let decoded = image::load_from_memory(bytes)?;
        Ok(Self::new(decoded.to_rgba8()))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Borrow the underlying RGBA buffer.
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Returns true if both handles point at the same buffer.
    pub fn ptr_eq(&self, other: &TileImage) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}

impl fmt::Debug for TileImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}
