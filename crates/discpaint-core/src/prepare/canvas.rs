//! Placing a source picture onto the square disc canvas.
//!
//! The encoder maps disc radii onto a 3000×3000 canvas whose center is the
//! spindle hole. The picture is scaled so its longest edge spans the usable
//! diameter of the disc type, turned gray, and centered on a white field.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

use super::{DiscImage, PrepareError};
use crate::geometry::DiscType;
use crate::luminance::gray_level;

/// Edge length of the disc canvas in pixels.
pub const DISC_CANVAS_SIZE: u32 = 3000;

/// Background color outside the placed picture.
const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Radius of the canvas area the picture may cover, in canvas pixels.
pub fn usable_radius(disc_type: DiscType) -> f64 {
    match disc_type {
        DiscType::Cd => 1200.0,
        DiscType::Dvd => 1300.0,
    }
}

/// Scale, desaturate and center `image` on a white disc canvas.
///
/// # Errors
///
/// Returns `PrepareError::EmptyImage` for zero-sized input and
/// `PrepareError::CorruptedFile` if the pixel buffer does not match its
/// dimensions.
pub fn fit_to_disc(image: &DiscImage, disc_type: DiscType) -> Result<DiscImage, PrepareError> {
    if image.is_empty() {
        return Err(PrepareError::EmptyImage {
            width: image.width,
            height: image.height,
        });
    }

    let (new_width, new_height) = scaled_dimensions(image.width, image.height, disc_type);

    let rgb = image
        .to_rgb_image()
        .ok_or_else(|| PrepareError::CorruptedFile("Failed to create RgbImage".to_string()))?;
    let mut resized = imageops::resize(&rgb, new_width, new_height, FilterType::Lanczos3);
    to_gray_in_place(&mut resized);

    let mut canvas = RgbImage::from_pixel(DISC_CANVAS_SIZE, DISC_CANVAS_SIZE, BACKGROUND);
    let center = (DISC_CANVAS_SIZE / 2) as i64;
    let offset_x = center - (new_width / 2) as i64;
    let offset_y = center - (new_height / 2) as i64;
    imageops::overlay(&mut canvas, &resized, offset_x, offset_y);

    tracing::debug!(
        source_width = image.width,
        source_height = image.height,
        placed_width = new_width,
        placed_height = new_height,
        disc = %disc_type,
        "placed image on disc canvas"
    );

    Ok(DiscImage::from_rgb_image(canvas))
}

/// Dimensions after scaling the longest edge to the usable diameter.
fn scaled_dimensions(width: u32, height: u32, disc_type: DiscType) -> (u32, u32) {
    let longest = width.max(height) as f64;
    let scale = 2.0 * usable_radius(disc_type) / longest;
    let new_width = ((width as f64 * scale) as u32).max(1);
    let new_height = ((height as f64 * scale) as u32).max(1);
    (new_width, new_height)
}

fn to_gray_in_place(img: &mut RgbImage) {
    for pixel in img.pixels_mut() {
        let [r, g, b] = pixel.0;
        let gray = gray_level(r, g, b);
        pixel.0 = [gray, gray, gray];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_dimensions_landscape_cd() {
        assert_eq!(scaled_dimensions(600, 300, DiscType::Cd), (2400, 1200));
    }

    #[test]
    fn test_scaled_dimensions_portrait_dvd() {
        assert_eq!(scaled_dimensions(100, 200, DiscType::Dvd), (1300, 2600));
    }

    #[test]
    fn test_scaled_dimensions_never_zero() {
        let (w, h) = scaled_dimensions(10_000, 1, DiscType::Cd);
        assert_eq!(w, 2400);
        assert_eq!(h, 1);
    }

    #[test]
    fn test_fit_to_disc_canvas_size_and_background() {
        let img = DiscImage::filled(40, 20, [0, 0, 0]);
        let disc = fit_to_disc(&img, DiscType::Cd).unwrap();

        assert_eq!(disc.width, DISC_CANVAS_SIZE);
        assert_eq!(disc.height, DISC_CANVAS_SIZE);
        // corners stay white, the center is covered by the black picture
        assert_eq!(disc.pixel_clamped(0, 0), [255, 255, 255]);
        assert_eq!(disc.pixel_clamped(1500, 1500), [0, 0, 0]);
        // 40x20 scaled to 2400x1200: rows above 900 stay background
        assert_eq!(disc.pixel_clamped(1500, 850), [255, 255, 255]);
    }

    #[test]
    fn test_fit_to_disc_is_gray() {
        let img = DiscImage::filled(10, 10, [255, 0, 0]);
        let disc = fit_to_disc(&img, DiscType::Dvd).unwrap();
        let [r, g, b] = disc.pixel_clamped(1500, 1500);
        assert_eq!(r, g);
        assert_eq!(g, b);
    }

    #[test]
    fn test_fit_to_disc_empty_error() {
        let img = DiscImage::new(0, 0, vec![]);
        assert!(matches!(
            fit_to_disc(&img, DiscType::Cd),
            Err(PrepareError::EmptyImage { .. })
        ));
    }
}
