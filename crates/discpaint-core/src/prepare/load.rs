//! Source image decoding with EXIF orientation handling.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageReader};

use super::{DiscImage, PrepareError};

/// EXIF orientation tag value for an upright picture.
const UPRIGHT: u32 = 1;

/// Load and decode an image file, applying EXIF orientation correction.
///
/// # Errors
///
/// Returns `PrepareError::IoError` if the file cannot be read and
/// `PrepareError::CorruptedFile` if the bytes do not decode.
pub fn load_image(path: impl AsRef<Path>) -> Result<DiscImage, PrepareError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .map_err(|e| PrepareError::IoError(format!("{}: {}", path.display(), e)))?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "read source image");
    decode_image(&bytes)
}

/// Decode an image from bytes, guessing the format from its content.
///
/// JPEG orientation tags are honoured so the picture lands on the disc the
/// way it is displayed, not the way the sensor stored it.
pub fn decode_image(bytes: &[u8]) -> Result<DiscImage, PrepareError> {
    if bytes.is_empty() {
        return Err(PrepareError::InvalidFormat);
    }

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| PrepareError::CorruptedFile(e.to_string()))?;
    let Some(format) = reader.format() else {
        return Err(PrepareError::InvalidFormat);
    };

    let decoded = reader
        .decode()
        .map_err(|e| PrepareError::CorruptedFile(e.to_string()))?;

    let orientation = exif_orientation(bytes);
    tracing::debug!(
        ?format,
        width = decoded.width(),
        height = decoded.height(),
        orientation,
        "decoded source image"
    );
    Ok(DiscImage::from_rgb_image(upright(decoded, orientation).into_rgb8()))
}

/// EXIF orientation tag (1..=8), or [`UPRIGHT`] when absent or unreadable.
fn exif_orientation(bytes: &[u8]) -> u32 {
    exif::Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()
        .and_then(|meta| {
            meta.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
                .and_then(|field| field.value.get_uint(0))
        })
        .filter(|value| (1..=8).contains(value))
        .unwrap_or(UPRIGHT)
}

/// Undo the camera orientation so the picture reads as displayed.
fn upright(picture: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => picture.fliph(),
        3 => picture.rotate180(),
        4 => picture.flipv(),
        // mirrored across the main diagonal
        5 => picture.rotate90().fliph(),
        6 => picture.rotate90(),
        // mirrored across the anti-diagonal
        7 => picture.rotate270().fliph(),
        8 => picture.rotate270(),
        _ => picture,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x * 10) as u8, (y * 10) as u8, 128])
        });
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_png() {
        let img = decode_image(&png_bytes(8, 4)).unwrap();
        assert_eq!(img.width, 8);
        assert_eq!(img.height, 4);
        assert_eq!(img.pixel_clamped(2, 1), [20, 10, 128]);
    }

    #[test]
    fn test_decode_empty_bytes() {
        assert!(matches!(
            decode_image(&[]),
            Err(PrepareError::InvalidFormat)
        ));
    }

    #[test]
    fn test_decode_unknown_bytes() {
        assert!(decode_image(b"not a picture").is_err());
    }

    #[test]
    fn test_png_without_exif_is_upright() {
        assert_eq!(exif_orientation(&png_bytes(2, 2)), UPRIGHT);
    }

    #[test]
    fn test_quarter_turns_swap_dimensions() {
        for (orientation, expected) in [
            (1, (6, 2)),
            (3, (6, 2)),
            (6, (2, 6)),
            (7, (2, 6)),
            (42, (6, 2)),
        ] {
            let turned = upright(DynamicImage::ImageRgb8(RgbImage::new(6, 2)), orientation);
            assert_eq!((turned.width(), turned.height()), expected, "orientation {orientation}");
        }
    }

    #[test]
    fn test_horizontal_flip_mirrors_pixels() {
        let mut raster = RgbImage::new(2, 1);
        raster.put_pixel(0, 0, image::Rgb([9, 9, 9]));
        let flipped = upright(DynamicImage::ImageRgb8(raster), 2).into_rgb8();
        assert_eq!(flipped.get_pixel(1, 0).0, [9, 9, 9]);
    }

    #[test]
    fn test_load_image_missing_file() {
        let result = load_image("/definitely/not/here.png");
        assert!(matches!(result, Err(PrepareError::IoError(_))));
    }

    #[test]
    fn test_load_image_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.png");
        std::fs::write(&path, png_bytes(3, 3)).unwrap();
        let img = load_image(&path).unwrap();
        assert_eq!((img.width, img.height), (3, 3));
    }
}
