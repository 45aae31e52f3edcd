//! Track encoding: from a prepared disc image to the burnable symbol stream.
//!
//! This module provides:
//! - [`SpiralPlan`], the per-track recurrence shared by both encoders
//! - [`SequentialEncoder`], a single-threaded driver
//! - [`ParallelEncoder`], a worker pool with ordered reassembly
//! - [`TrackSink`], the interleaving and sector-batching output stage
//!
//! Both drivers produce byte-identical output for the same parameters.
//!
//! # Examples
//!
//! ```ignore
//! use discpaint_core::encode::{encode_to_file, EncodeParams, RunControl};
//!
//! let params = EncodeParams::new(22951.52, 1.3865961, 24.5).with_workers(4);
//! let mut control = RunControl::new().on_progress(|p| println!("{p}%"));
//! let outcome = encode_to_file(&image, &params, "disc.bin", &mut control)?;
//! ```

mod control;
mod parallel;
mod plan;
mod reorder;
mod sequential;
mod sink;
mod types;

use std::path::Path;

use crate::prepare::DiscImage;

pub use control::{CancelToken, RunControl};
pub use parallel::{compute_track, ParallelEncoder};
pub use plan::{SpiralParameters, SpiralPlan};
pub use reorder::ReorderBuffer;
pub use sequential::SequentialEncoder;
pub use sink::{OutputFile, TrackSink};
pub use types::{
    default_workers, EncodeError, EncodeOutcome, EncodeParams, EncodeSummary, OutputLayout,
    TrackJob, TrackResult, DEFAULT_WORKER_CAP, MAX_WORKERS,
};

/// Encode `image` into the file at `path`.
///
/// `params.workers == 0` selects the sequential encoder, anything else the
/// parallel one. Parameters are validated before the file is created. The
/// file is kept only when the run completes; on cancellation or error it is
/// removed.
pub fn encode_to_file(
    image: &DiscImage,
    params: &EncodeParams,
    path: impl AsRef<Path>,
    control: &mut RunControl<'_>,
) -> Result<EncodeOutcome, EncodeError> {
    params.validate()?;
    types::check_image(image)?;

    let mut file = OutputFile::create(path)?;
    let outcome = if params.workers == 0 {
        SequentialEncoder::new(params.clone())?.run(image, &mut file, control)?
    } else {
        ParallelEncoder::new(params.clone())?.run(image, &mut file, control)?
    };

    match outcome {
        EncodeOutcome::Completed(summary) => {
            let path = file.commit()?;
            tracing::info!(
                path = %path.display(),
                bytes = summary.bytes_written,
                "output written"
            );
        }
        EncodeOutcome::Cancelled(_) => {
            tracing::warn!(path = %file.path().display(), "run cancelled, discarding output");
        }
    }
    Ok(outcome)
}
