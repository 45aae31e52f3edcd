//! The outward spiral: per-track parameters in track order.
//!
//! Both encoders walk the same recurrence, so the job sequence produced here
//! is the single source of truth for track geometry, dither phases and
//! alignment padding.

use crate::geometry::CanvasMapping;
use crate::quantize::DitherPhase;

use super::{EncodeParams, TrackJob};

/// Mutable spiral state, advanced once per track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpiralParameters {
    /// Fractional samples on the current track.
    pub track_sample_count: f64,
    /// Physical radius of the current track, in millimetres.
    pub radius: f64,
    /// Radius gained per track, `dtr * r0 / tr0`, constant over a run.
    pub radius_step: f64,
    /// Fractional samples placed so far.
    pub accumulated: f64,
}

impl SpiralParameters {
    pub fn new(tr0: f64, dtr: f64, r0: f64) -> Self {
        Self {
            track_sample_count: tr0,
            radius: r0,
            radius_step: dtr * r0 / tr0,
            accumulated: 0.0,
        }
    }
}

/// Iterator over the tracks of one run.
#[derive(Debug, Clone)]
pub struct SpiralPlan {
    spiral: SpiralParameters,
    dtr: f64,
    budget: f64,
    mapping: CanvasMapping,
    phase: DitherPhase,
    next_index: u64,
    /// Whole symbols emitted so far; always `floor(accumulated)`.
    emitted: u64,
}

impl SpiralPlan {
    pub fn new(params: &EncodeParams, mapping: CanvasMapping) -> Self {
        Self {
            spiral: SpiralParameters::new(params.tr0, params.dtr, params.r0),
            dtr: params.dtr,
            budget: params.total_budget() as f64,
            mapping,
            phase: DitherPhase::default(),
            next_index: 0,
            emitted: 0,
        }
    }

    pub fn spiral(&self) -> &SpiralParameters {
        &self.spiral
    }

    /// Symbols emitted by all tracks handed out so far.
    pub fn emitted_symbols(&self) -> u64 {
        self.emitted
    }

    /// Tracks handed out so far.
    pub fn tracks_planned(&self) -> u64 {
        self.next_index
    }
}

impl Iterator for SpiralPlan {
    type Item = TrackJob;

    fn next(&mut self) -> Option<TrackJob> {
        let spiral = &mut self.spiral;
        if spiral.accumulated >= self.budget - spiral.track_sample_count {
            return None;
        }

        let progress = (100.0 * spiral.accumulated / self.budget) as u32;
        let sample_count = spiral.track_sample_count.floor() as usize;

        spiral.accumulated += spiral.track_sample_count;
        let aligned = spiral.accumulated.floor() as u64;
        let padding = aligned.saturating_sub(self.emitted + sample_count as u64) as usize;

        let job = TrackJob {
            track_index: self.next_index,
            track_sample_count: spiral.track_sample_count,
            radius: spiral.radius,
            mapping: self.mapping,
            sample_count,
            phase: self.phase,
            padding,
            progress,
        };

        self.emitted += (sample_count + padding) as u64;
        self.phase = DitherPhase {
            ring: self.phase.next_ring(),
            sample: self.phase.sample_after((sample_count + padding) as u64),
        };
        spiral.track_sample_count += self.dtr;
        spiral.radius += spiral.radius_step;
        self.next_index += 1;
        Some(job)
    }
}
