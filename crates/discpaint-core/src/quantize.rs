//! Gray-level quantization into the four physical-layer symbols.
//!
//! Each gray value `g` falls between two palette levels: `low = g / 85` and
//! `high = min(low + 1, 3)`. Dithering picks one of them so that, averaged
//! over a patch of the disc, the reflectivity approximates `g`.
//!
//! ## Dithering modes
//!
//! - **Ordered**: a deterministic threshold `ring_phase * 5 + sample_phase`
//!   that cycles over 17 tracks and 5 samples.
//! - **Random mix**: a uniform draw in `[0, 85)` from a seeded generator, one
//!   independent stream per track.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::geometry::CanvasMapping;
use crate::luminance::gray_level;
use crate::prepare::DiscImage;

/// Output byte for each quantization level, darkest first.
pub const PALETTE: [u8; 4] = [0x10, 0x21, 0x28, 0xAA];

/// Gray-level width of one quantization step.
pub const LEVEL_STEP: u8 = 85;

/// Number of tracks before the ordered-dither ring phase repeats.
pub const RING_PHASE_PERIOD: u32 = 17;

/// Number of samples before the ordered-dither sample phase repeats.
pub const SAMPLE_PHASE_PERIOD: u32 = 5;

/// Remainder that always rounds up, in both dithering modes.
const ALWAYS_HIGH_REMAINDER: u8 = LEVEL_STEP - 1;

/// Dithering strategy used to choose between adjacent levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DitherMode {
    /// Deterministic ring/sample threshold pattern.
    #[default]
    Ordered,
    /// Seeded uniform random threshold.
    RandomMix,
}

/// The two candidate levels for a gray value and its position between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Levels {
    pub low: usize,
    pub high: usize,
    pub remainder: u8,
}

impl Levels {
    #[inline]
    pub fn of(gray: u8) -> Self {
        let low = (gray / LEVEL_STEP).min(3) as usize;
        Self {
            low,
            high: (low + 1).min(3),
            remainder: gray % LEVEL_STEP,
        }
    }

    /// Level picked by the ordered threshold.
    #[inline]
    pub fn ordered(self, ring_phase: u32, sample_phase: u32) -> usize {
        let threshold = ring_phase * SAMPLE_PHASE_PERIOD + sample_phase;
        if self.remainder as u32 > threshold || self.remainder == ALWAYS_HIGH_REMAINDER {
            self.high
        } else {
            self.low
        }
    }

    /// Level picked by a random draw in `[0, 85)`.
    #[inline]
    pub fn random_mix(self, draw: u8) -> usize {
        if draw < self.remainder || self.remainder == ALWAYS_HIGH_REMAINDER {
            self.high
        } else {
            self.low
        }
    }
}

/// Palette byte for a level index, clamped to the last level.
#[inline]
pub fn symbol(index: usize) -> u8 {
    PALETTE[index.min(PALETTE.len() - 1)]
}

/// Where the ordered-dither counters stand at the start of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DitherPhase {
    /// Cycles 0..17, one step per track.
    pub ring: u32,
    /// Cycles 0..5, one step per emitted symbol.
    pub sample: u32,
}

impl DitherPhase {
    /// Sample phase after `count` further symbols.
    #[inline]
    pub fn sample_after(self, count: u64) -> u32 {
        ((self.sample as u64 + count) % SAMPLE_PHASE_PERIOD as u64) as u32
    }

    /// Ring phase of the following track.
    #[inline]
    pub fn next_ring(self) -> u32 {
        (self.ring + 1) % RING_PHASE_PERIOD
    }
}

/// Per-run dithering configuration shared by every track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dither {
    pub mode: DitherMode,
    pub seed: u64,
}

impl Dither {
    pub fn ordered() -> Self {
        Self::default()
    }

    pub fn random_mix(seed: u64) -> Self {
        Self {
            mode: DitherMode::RandomMix,
            seed,
        }
    }

    /// Generator for one track. Every track reads its own stream of the
    /// seeded generator, so tracks can be computed in any order.
    fn track_rng(&self, track_index: u64) -> Option<ChaCha8Rng> {
        match self.mode {
            DitherMode::Ordered => None,
            DitherMode::RandomMix => {
                let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
                rng.set_stream(track_index);
                Some(rng)
            }
        }
    }
}

/// Parameters of one ring of the spiral, enough to sample it independently.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ring {
    pub track_index: u64,
    /// Physical radius in millimetres.
    pub radius: f64,
    /// Number of angular samples, `floor(track_sample_count)`.
    pub sample_count: usize,
    pub phase: DitherPhase,
}

/// Lazy sequence of palette bytes for one ring.
///
/// The sequence is a pure function of its inputs: constructing a new sampler
/// with the same arguments yields the same bytes.
#[derive(Debug, Clone)]
pub struct TrackSampler<'a> {
    image: &'a DiscImage,
    mapping: CanvasMapping,
    ring_radius: f64,
    sample_count: usize,
    next: usize,
    ring_phase: u32,
    sample_phase: u32,
    rng: Option<ChaCha8Rng>,
}

impl<'a> TrackSampler<'a> {
    pub fn new(image: &'a DiscImage, mapping: CanvasMapping, ring: &Ring, dither: Dither) -> Self {
        Self {
            image,
            mapping,
            ring_radius: mapping.ring_radius(ring.radius),
            sample_count: ring.sample_count,
            next: 0,
            ring_phase: ring.phase.ring,
            sample_phase: ring.phase.sample,
            rng: dither.track_rng(ring.track_index),
        }
    }

    /// Number of samples not yet produced.
    pub fn remaining(&self) -> usize {
        self.sample_count - self.next
    }
}

impl Iterator for TrackSampler<'_> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.next >= self.sample_count {
            return None;
        }

        let (x, y) = self
            .mapping
            .sample_position(self.ring_radius, self.next, self.sample_count);
        let [r, g, b] = self.image.pixel_clamped(x, y);
        let levels = Levels::of(gray_level(r, g, b));

        let index = match self.rng.as_mut() {
            Some(rng) => levels.random_mix(rng.gen_range(0..LEVEL_STEP)),
            None => levels.ordered(self.ring_phase, self.sample_phase),
        };

        self.next += 1;
        self.sample_phase = (self.sample_phase + 1) % SAMPLE_PHASE_PERIOD;
        Some(symbol(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TrackSampler<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(sample_count: usize, phase: DitherPhase) -> Ring {
        Ring {
            track_index: 0,
            radius: 24.5,
            sample_count,
            phase,
        }
    }

    #[test]
    fn test_levels_boundaries() {
        assert_eq!(Levels::of(0), Levels { low: 0, high: 1, remainder: 0 });
        assert_eq!(Levels::of(84), Levels { low: 0, high: 1, remainder: 84 });
        assert_eq!(Levels::of(85), Levels { low: 1, high: 2, remainder: 0 });
        assert_eq!(Levels::of(254), Levels { low: 2, high: 3, remainder: 84 });
        assert_eq!(Levels::of(255), Levels { low: 3, high: 3, remainder: 0 });
    }

    #[test]
    fn test_exact_multiples_never_round_up() {
        for gray in [0u8, 85, 170, 255] {
            let levels = Levels::of(gray);
            for ring_phase in 0..RING_PHASE_PERIOD {
                for sample_phase in 0..SAMPLE_PHASE_PERIOD {
                    assert_eq!(levels.ordered(ring_phase, sample_phase), levels.low);
                }
            }
            for draw in 0..LEVEL_STEP {
                assert_eq!(levels.random_mix(draw), levels.low);
            }
        }
    }

    #[test]
    fn test_remainder_84_always_rounds_up() {
        let levels = Levels::of(84);
        assert_eq!(levels.ordered(16, 4), 1);
        assert_eq!(levels.random_mix(84), 1);
    }

    #[test]
    fn test_ordered_threshold() {
        // remainder 12 against threshold ring*5 + sample
        let levels = Levels::of(97);
        assert_eq!(levels.remainder, 12);
        assert_eq!(levels.ordered(2, 1), levels.high); // 12 > 11
        assert_eq!(levels.ordered(2, 2), levels.low); // 12 > 12 is false
    }

    #[test]
    fn test_symbol_clamps_index() {
        assert_eq!(symbol(0), 0x10);
        assert_eq!(symbol(3), 0xAA);
        assert_eq!(symbol(7), 0xAA);
    }

    #[test]
    fn test_phase_advance() {
        let phase = DitherPhase { ring: 16, sample: 3 };
        assert_eq!(phase.next_ring(), 0);
        assert_eq!(phase.sample_after(0), 3);
        assert_eq!(phase.sample_after(2), 0);
        assert_eq!(phase.sample_after(1001), 4);
    }

    #[test]
    fn test_sampler_flat_image() {
        let img = DiscImage::filled(100, 100, [170, 170, 170]);
        let mapping = CanvasMapping::centered(50.0, 50.0);
        let full = ring(64, DitherPhase::default());
        let sampler = TrackSampler::new(&img, mapping, &full, Dither::ordered());
        assert_eq!(sampler.len(), 64);
        assert!(sampler.clone().all(|b| b == PALETTE[2]));
        assert_eq!(sampler.count(), 64);
    }

    #[test]
    fn test_sampler_empty_ring() {
        let img = DiscImage::filled(4, 4, [0, 0, 0]);
        let mapping = CanvasMapping::centered(2.0, 2.0);
        let empty = ring(0, DitherPhase::default());
        let mut sampler = TrackSampler::new(&img, mapping, &empty, Dither::ordered());
        assert_eq!(sampler.next(), None);
    }

    #[test]
    fn test_sampler_is_restartable() {
        let img = DiscImage::filled(64, 64, [120, 90, 60]);
        let mapping = CanvasMapping::centered(32.0, 32.0);
        let r = ring(500, DitherPhase { ring: 3, sample: 2 });
        for dither in [Dither::ordered(), Dither::random_mix(7)] {
            let first: Vec<u8> = TrackSampler::new(&img, mapping, &r, dither).collect();
            let second: Vec<u8> = TrackSampler::new(&img, mapping, &r, dither).collect();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_random_mix_streams_differ_per_track() {
        let img = DiscImage::filled(64, 64, [128, 128, 128]);
        let mapping = CanvasMapping::centered(32.0, 32.0);
        let mut a = ring(2000, DitherPhase::default());
        let mut b = a;
        a.track_index = 1;
        b.track_index = 2;
        let first: Vec<u8> = TrackSampler::new(&img, mapping, &a, Dither::random_mix(1)).collect();
        let second: Vec<u8> = TrackSampler::new(&img, mapping, &b, Dither::random_mix(1)).collect();
        assert_ne!(first, second);
        // gray 128 sits between levels 1 and 2
        assert!(first.iter().all(|&s| s == PALETTE[1] || s == PALETTE[2]));
    }

    #[test]
    fn test_ordered_sampler_honours_starting_phase() {
        // remainder 3: rounds up only while ring 0 and sample phase < 3
        let img = DiscImage::filled(16, 16, [88, 88, 88]);
        let mapping = CanvasMapping::centered(8.0, 8.0);
        let r = ring(5, DitherPhase { ring: 0, sample: 1 });
        let out: Vec<u8> = TrackSampler::new(&img, mapping, &r, Dither::ordered()).collect();
        assert_eq!(
            out,
            vec![PALETTE[2], PALETTE[2], PALETTE[1], PALETTE[1], PALETTE[2]]
        );
    }
}
