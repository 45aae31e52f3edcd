//! Core types for track encoding.

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{CanvasMapping, DiscType};
use crate::prepare::DiscImage;
use crate::quantize::{Dither, DitherMode, DitherPhase, Ring};

/// Largest worker count accepted by the parallel pipeline.
pub const MAX_WORKERS: usize = 16;

/// Default cap on worker threads, regardless of core count.
pub const DEFAULT_WORKER_CAP: usize = 8;

/// Error types for track encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// A run parameter is out of range. Rejected before any work starts.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Creating or writing the output failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// A track worker could not compute its track.
    #[error("Track {track_index} failed: {message}")]
    WorkerFailure { track_index: u64, message: String },

    /// Reassembly received a track it cannot place in the output order.
    #[error("Track {track_index} out of order: {message}")]
    OutOfOrder { track_index: u64, message: String },

    /// The worker pool shut down with tracks still missing.
    #[error("Pipeline stopped before track {next_expected} was delivered")]
    PipelineDisconnected { next_expected: u64 },
}

impl EncodeError {
    pub(crate) fn io(context: impl Into<String>) -> impl FnOnce(io::Error) -> Self {
        let context = context.into();
        move |source| EncodeError::Io { context, source }
    }
}

/// Byte layout of the output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLayout {
    /// Symbols pass through the CIRC-shaped interleaver before sector packing.
    #[default]
    Interleaved,
    /// Symbols are written in spiral order, uninterleaved.
    Raw,
}

/// Parameters of one encoding run.
///
/// `tr0`, `dtr` and `r0` usually come from a disc preset; they describe the
/// spiral the burner will cut for this particular disc brand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeParams {
    /// Samples on the innermost track.
    pub tr0: f64,
    /// Samples added per track.
    pub dtr: f64,
    /// Radius of the innermost track, in millimetres.
    pub r0: f64,
    pub disc_type: DiscType,
    pub dither: DitherMode,
    /// Seed for random-mix dithering.
    pub seed: u64,
    pub layout: OutputLayout,
    /// Track workers; 0 runs the sequential encoder.
    pub workers: usize,
    /// Replaces the disc type's symbol budget when set.
    pub total_symbols: Option<u64>,
}

impl EncodeParams {
    pub fn new(tr0: f64, dtr: f64, r0: f64) -> Self {
        Self {
            tr0,
            dtr,
            r0,
            disc_type: DiscType::Cd,
            dither: DitherMode::Ordered,
            seed: 0,
            layout: OutputLayout::Interleaved,
            workers: 0,
            total_symbols: None,
        }
    }

    pub fn with_disc_type(mut self, disc_type: DiscType) -> Self {
        self.disc_type = disc_type;
        self
    }

    pub fn with_dither(mut self, dither: DitherMode) -> Self {
        self.dither = dither;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_layout(mut self, layout: OutputLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_total_symbols(mut self, total: u64) -> Self {
        self.total_symbols = Some(total);
        self
    }

    /// Symbol budget for the run.
    pub fn total_budget(&self) -> u64 {
        self.total_symbols.unwrap_or_else(|| self.disc_type.total_symbols())
    }

    pub fn dither_config(&self) -> Dither {
        Dither {
            mode: self.dither,
            seed: self.seed,
        }
    }

    /// Check every parameter before any output is created.
    pub fn validate(&self) -> Result<(), EncodeError> {
        if !(self.tr0.is_finite() && self.tr0 > 0.0) {
            return Err(EncodeError::InvalidParameter(format!(
                "tr0 must be a positive number, got {}",
                self.tr0
            )));
        }
        if !(self.dtr.is_finite() && self.dtr >= 0.0) {
            return Err(EncodeError::InvalidParameter(format!(
                "dtr must be a non-negative number, got {}",
                self.dtr
            )));
        }
        if !(self.r0.is_finite() && self.r0 > 0.0) {
            return Err(EncodeError::InvalidParameter(format!(
                "r0 must be a positive number, got {}",
                self.r0
            )));
        }
        if self.workers > MAX_WORKERS {
            return Err(EncodeError::InvalidParameter(format!(
                "workers must be between 0 and {}, got {}",
                MAX_WORKERS, self.workers
            )));
        }
        if self.total_symbols == Some(0) {
            return Err(EncodeError::InvalidParameter(
                "total symbol budget must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Reject an image the encoder cannot sample.
pub(crate) fn check_image(image: &DiscImage) -> Result<(), EncodeError> {
    if image.width == 0 || image.height == 0 {
        return Err(EncodeError::InvalidParameter(format!(
            "image is empty ({}x{})",
            image.width, image.height
        )));
    }
    let expected = image.width as usize * image.height as usize * 3;
    if image.pixels.len() != expected {
        return Err(EncodeError::InvalidParameter(format!(
            "image has {} pixel bytes, expected {} for {}x{}",
            image.pixels.len(),
            expected,
            image.width,
            image.height
        )));
    }
    Ok(())
}

/// Worker count used when the caller does not choose one.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(DEFAULT_WORKER_CAP)
}

/// Immutable snapshot of everything needed to compute one track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackJob {
    pub track_index: u64,
    /// Fractional samples-per-track value this track was cut from.
    pub track_sample_count: f64,
    /// Physical radius in millimetres.
    pub radius: f64,
    pub mapping: CanvasMapping,
    /// `floor(track_sample_count)`.
    pub sample_count: usize,
    pub phase: DitherPhase,
    /// Symbol-0 bytes appended after the samples to keep the stream aligned
    /// with the accumulated fractional sample count.
    pub padding: usize,
    /// Integer progress percentage before this track.
    pub progress: u32,
}

impl TrackJob {
    pub fn ring(&self) -> Ring {
        Ring {
            track_index: self.track_index,
            radius: self.radius,
            sample_count: self.sample_count,
            phase: self.phase,
        }
    }

    /// Symbols this track contributes to the stream.
    pub fn symbol_count(&self) -> usize {
        self.sample_count + self.padding
    }
}

/// Output of one worker for one job.
#[derive(Debug)]
pub struct TrackResult {
    pub track_index: u64,
    pub symbols: Result<Vec<u8>, EncodeError>,
}

/// Totals of a finished or stopped run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EncodeSummary {
    /// Tracks fully written to the output.
    pub tracks: u64,
    /// Symbols fed into the output stage, including alignment padding.
    pub symbols: u64,
    /// Bytes written to the output.
    pub bytes_written: u64,
}

/// Terminal state of a run that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeOutcome {
    Completed(EncodeSummary),
    Cancelled(EncodeSummary),
}

impl EncodeOutcome {
    pub fn summary(&self) -> &EncodeSummary {
        match self {
            EncodeOutcome::Completed(summary) | EncodeOutcome::Cancelled(summary) => summary,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, EncodeOutcome::Cancelled(_))
    }
}
