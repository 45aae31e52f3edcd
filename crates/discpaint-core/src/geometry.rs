//! Disc geometry: physical constants and the mapping from spiral positions
//! to canvas pixels.
//!
//! # Coordinate System
//!
//! - Spiral radii are physical millimetres measured from the spindle
//! - Canvas coordinates are pixels, origin top-left, center at the spindle
//! - A physical radius of [`PHYSICAL_RADIUS_MM`] maps to [`IMAGE_RADIUS`] pixels

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canvas-space radius, in pixels, of the disc's outer reference circle.
pub const IMAGE_RADIUS: f64 = 1500.0;

/// Physical radius, in millimetres, that [`IMAGE_RADIUS`] corresponds to.
pub const PHYSICAL_RADIUS_MM: f64 = 57.5;

/// Symbol budget of a CD-R/RW.
pub const CD_TOTAL_SYMBOLS: u64 = 800 * 1024 * 1024;

/// Symbol budget of a single-layer DVD.
pub const DVD_TOTAL_SYMBOLS: u64 = 4700 * 1024 * 1024;

/// Target disc family. Selects the total symbol budget of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscType {
    #[default]
    Cd,
    Dvd,
}

impl DiscType {
    /// Total number of symbols the spiral may place on this disc.
    pub fn total_symbols(self) -> u64 {
        match self {
            DiscType::Cd => CD_TOTAL_SYMBOLS,
            DiscType::Dvd => DVD_TOTAL_SYMBOLS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DiscType::Cd => "cd",
            DiscType::Dvd => "dvd",
        }
    }
}

impl fmt::Display for DiscType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscType {
    type Err = UnknownDiscType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cd" => Ok(DiscType::Cd),
            "dvd" => Ok(DiscType::Dvd),
            _ => Err(UnknownDiscType(s.to_string())),
        }
    }
}

/// Returned when a disc type name is neither `cd` nor `dvd`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown disc type '{0}' (expected 'cd' or 'dvd')")]
pub struct UnknownDiscType(pub String);

/// Fixed mapping between physical radii and canvas pixels for one image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasMapping {
    /// Canvas X coordinate of the spindle.
    pub center_x: f64,
    /// Canvas Y coordinate of the spindle.
    pub center_y: f64,
    /// Canvas radius of the reference circle.
    pub image_radius: f64,
    /// Physical radius of the reference circle, in millimetres.
    pub physical_radius: f64,
}

impl CanvasMapping {
    /// Mapping for a canvas centered at `(center_x, center_y)` with the
    /// standard disc constants.
    pub fn centered(center_x: f64, center_y: f64) -> Self {
        Self {
            center_x,
            center_y,
            image_radius: IMAGE_RADIUS,
            physical_radius: PHYSICAL_RADIUS_MM,
        }
    }

    /// Canvas radius, in pixels, of a ring at `radius` millimetres.
    #[inline]
    pub fn ring_radius(&self, radius: f64) -> f64 {
        self.image_radius * radius / self.physical_radius
    }

    /// Pixel coordinates of sample `index` out of `sample_count` on a ring of
    /// canvas radius `ring_radius`, truncated toward zero.
    #[inline]
    pub fn sample_position(
        &self,
        ring_radius: f64,
        index: usize,
        sample_count: usize,
    ) -> (i64, i64) {
        let angle = 2.0 * std::f64::consts::PI * index as f64 / sample_count as f64;
        let x = self.center_x + ring_radius * angle.cos();
        let y = self.center_y + ring_radius * angle.sin();
        (x as i64, y as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disc_type_budgets() {
        assert_eq!(DiscType::Cd.total_symbols(), 838_860_800);
        assert_eq!(DiscType::Dvd.total_symbols(), 4_928_307_200);
    }

    #[test]
    fn test_disc_type_parse() {
        assert_eq!("cd".parse::<DiscType>(), Ok(DiscType::Cd));
        assert_eq!(" DVD ".parse::<DiscType>(), Ok(DiscType::Dvd));
        assert!("bluray".parse::<DiscType>().is_err());
    }

    #[test]
    fn test_disc_type_display_round_trip() {
        for disc in [DiscType::Cd, DiscType::Dvd] {
            assert_eq!(disc.to_string().parse::<DiscType>(), Ok(disc));
        }
    }

    #[test]
    fn test_ring_radius_reference_circle() {
        let mapping = CanvasMapping::centered(1500.0, 1500.0);
        assert!((mapping.ring_radius(PHYSICAL_RADIUS_MM) - IMAGE_RADIUS).abs() < 1e-9);
        assert!((mapping.ring_radius(0.0)).abs() < 1e-9);
    }

    #[test]
    fn test_sample_position_quadrants() {
        let mapping = CanvasMapping::centered(100.0, 100.0);
        assert_eq!(mapping.sample_position(50.0, 0, 4), (150, 100));
        assert_eq!(mapping.sample_position(50.0, 1, 4), (100, 150));
        // cos(pi) = -1 exactly enough for truncation to land on 50
        assert_eq!(mapping.sample_position(50.0, 2, 4), (50, 100));
    }
}
