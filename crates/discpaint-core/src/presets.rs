//! Spiral parameters measured for specific disc brands.

use serde::Serialize;

use crate::encode::EncodeParams;
use crate::geometry::DiscType;

/// Spiral geometry of one disc product.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiscPreset {
    /// Lookup key, e.g. `verbatim-cd-rw-1`.
    pub key: &'static str,
    /// Product name as printed on the disc.
    pub name: &'static str,
    pub disc_type: DiscType,
    pub tr0: f64,
    pub dtr: f64,
    pub r0: f64,
}

impl DiscPreset {
    /// Encode parameters for this disc, with every other setting at its default.
    pub fn params(&self) -> EncodeParams {
        EncodeParams::new(self.tr0, self.dtr, self.r0).with_disc_type(self.disc_type)
    }
}

static PRESETS: [DiscPreset; 8] = [
    DiscPreset {
        key: "verbatim-cd-rw-1",
        name: "Verbatim CD-RW Hi-Speed 8x-10x 700 MB SERL 1",
        disc_type: DiscType::Cd,
        tr0: 22951.52,
        dtr: 1.3865961,
        r0: 24.5,
    },
    DiscPreset {
        key: "verbatim-cd-rw-2",
        name: "Verbatim CD-RW Hi-Speed 8x-10x 700 MB SERL 2",
        disc_type: DiscType::Cd,
        tr0: 22951.07,
        dtr: 1.3865958,
        r0: 24.5,
    },
    DiscPreset {
        key: "eperformance-cd-rw",
        name: "eProformance CD-RW 4x-10x 700 MB Prodisk Technology Inc",
        disc_type: DiscType::Cd,
        tr0: 22936.085,
        dtr: 1.38314,
        r0: 24.5,
    },
    DiscPreset {
        key: "tdk-cd-rw",
        name: "TDK CD-RW 4x-12x HIGH SPEED 700MB 80MIN",
        disc_type: DiscType::Cd,
        tr0: 23000.145,
        dtr: 1.38659775,
        r0: 24.5,
    },
    // DVD geometry is estimated, not measured
    DiscPreset {
        key: "generic-dvd-r",
        name: "Generic DVD-R 4.7GB",
        disc_type: DiscType::Dvd,
        tr0: 48000.0,
        dtr: 0.74,
        r0: 24.0,
    },
    DiscPreset {
        key: "generic-dvd-rw",
        name: "Generic DVD-RW 4.7GB",
        disc_type: DiscType::Dvd,
        tr0: 48050.0,
        dtr: 0.741,
        r0: 24.0,
    },
    DiscPreset {
        key: "verbatim-dvd-r",
        name: "Verbatim DVD-R 16x 4.7GB",
        disc_type: DiscType::Dvd,
        tr0: 47980.0,
        dtr: 0.739,
        r0: 24.0,
    },
    DiscPreset {
        key: "sony-dvd-rw",
        name: "Sony DVD-RW 4x 4.7GB",
        disc_type: DiscType::Dvd,
        tr0: 48100.0,
        dtr: 0.742,
        r0: 24.0,
    },
];

/// Every known preset, CDs first.
pub fn all() -> &'static [DiscPreset] {
    &PRESETS
}

/// Preset by key, ignoring ASCII case.
pub fn find(key: &str) -> Option<&'static DiscPreset> {
    PRESETS.iter().find(|p| p.key.eq_ignore_ascii_case(key))
}

/// Preset used when only the disc type is known.
pub fn default_for(disc_type: DiscType) -> &'static DiscPreset {
    match disc_type {
        DiscType::Cd => &PRESETS[0],
        DiscType::Dvd => &PRESETS[4],
    }
}
