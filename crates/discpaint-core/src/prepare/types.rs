//! Types shared by image loading and canvas placement.

use thiserror::Error;

/// Failures while turning a picture file into a disc canvas.
#[derive(Debug, Error)]
pub enum PrepareError {
    /// The bytes are not a JPEG or PNG picture.
    #[error("Unrecognized image format")]
    InvalidFormat,

    /// The picture could not be decoded.
    #[error("Could not decode image: {0}")]
    CorruptedFile(String),

    /// The picture file could not be read.
    #[error("Could not read image: {0}")]
    IoError(String),

    /// The image has no pixels to place on the disc.
    #[error("Image is empty ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
}

/// An RGB raster sampled by the track encoder.
///
/// Pixels are stored row-major, 3 bytes per pixel. The encoder only reads
/// from it, so one image can be shared by every track worker.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscImage {
    pub width: u32,
    pub height: u32,
    /// RGB pixel data, length `width * height * 3`.
    pub pixels: Vec<u8>,
}

impl DiscImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize * 3);
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Create an image filled with a single color.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let count = (width as usize) * (height as usize);
        let mut pixels = Vec::with_capacity(count * 3);
        for _ in 0..count {
            pixels.extend_from_slice(&rgb);
        }
        Self::new(width, height, pixels)
    }

    pub fn from_rgb_image(raster: image::RgbImage) -> Self {
        Self {
            width: raster.width(),
            height: raster.height(),
            pixels: raster.into_raw(),
        }
    }

    /// Copy into an `image` buffer; `None` if the pixel count is wrong.
    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        image::RgbImage::from_raw(self.width, self.height, self.pixels.to_vec())
    }

    /// Read the pixel at `(x, y)`, clamping both coordinates to the nearest edge.
    #[inline]
    pub fn pixel_clamped(&self, x: i64, y: i64) -> [u8; 3] {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        let offset = (y * self.width as usize + x) * 3;
        [
            self.pixels[offset],
            self.pixels[offset + 1],
            self.pixels[offset + 2],
        ]
    }

    /// Geometric center of the image in pixel coordinates.
    pub fn center(&self) -> (f64, f64) {
        (self.width as f64 / 2.0, self.height as f64 / 2.0)
    }

    /// True when there is nothing to sample.
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty() || self.width.min(self.height) == 0
    }
}
