//! Luminance calculation using ITU-R BT.601 coefficients.
//!
//! The track encoder quantizes gray levels, so the conversion has to be exact
//! at the quantization boundaries (multiples of 85). The weights are applied in
//! integer thousandths, which gives the true truncated value of
//! `0.299·R + 0.587·G + 0.114·B` without floating point drift.

/// BT.601 weight for the red channel, in thousandths.
pub const LUMA_R: u32 = 299;

/// BT.601 weight for the green channel, in thousandths.
pub const LUMA_G: u32 = 587;

/// BT.601 weight for the blue channel, in thousandths.
pub const LUMA_B: u32 = 114;

/// Calculate the truncated gray level of an 8-bit RGB pixel.
///
/// # Arguments
/// * `r` - Red channel value (0-255)
/// * `g` - Green channel value (0-255)
/// * `b` - Blue channel value (0-255)
///
/// # Returns
/// Gray value (0-255), `floor(0.299·R + 0.587·G + 0.114·B)`
#[inline]
pub fn gray_level(r: u8, g: u8, b: u8) -> u8 {
    let weighted = LUMA_R * r as u32 + LUMA_G * g as u32 + LUMA_B * b as u32;
    // weights sum to 1000, so the quotient never exceeds 255
    (weighted / 1000) as u8
}
