//! Single-threaded track encoder.

use std::io::Write;

use crate::geometry::CanvasMapping;
use crate::prepare::DiscImage;
use crate::quantize::{TrackSampler, PALETTE};

use super::types::check_image;
use super::{EncodeError, EncodeOutcome, EncodeParams, RunControl, SpiralPlan, TrackSink};

/// Mapping for an image whose center is the spindle.
pub(crate) fn image_mapping(image: &DiscImage) -> CanvasMapping {
    let (center_x, center_y) = image.center();
    CanvasMapping::centered(center_x, center_y)
}

/// Encodes tracks one after another on the calling thread.
#[derive(Debug, Clone)]
pub struct SequentialEncoder {
    params: EncodeParams,
}

impl SequentialEncoder {
    /// # Errors
    /// Returns [`EncodeError::InvalidParameter`] for out-of-range parameters.
    pub fn new(params: EncodeParams) -> Result<Self, EncodeError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &EncodeParams {
        &self.params
    }

    /// Encode `image` into `out`.
    ///
    /// On cancellation whatever was already written stays in `out`; removing
    /// a partial file is up to the caller (see [`super::encode_to_file`]).
    ///
    /// # Errors
    /// [`EncodeError::InvalidParameter`] for an empty or malformed image,
    /// [`EncodeError::Io`] when writing to `out` fails.
    pub fn run<W: Write>(
        &self,
        image: &DiscImage,
        out: W,
        control: &mut RunControl<'_>,
    ) -> Result<EncodeOutcome, EncodeError> {
        check_image(image)?;
        let dither = self.params.dither_config();
        let mut sink = TrackSink::new(out, self.params.layout);

        tracing::info!(
            tr0 = self.params.tr0,
            dtr = self.params.dtr,
            r0 = self.params.r0,
            budget = self.params.total_budget(),
            "sequential encode started"
        );

        for job in SpiralPlan::new(&self.params, image_mapping(image)) {
            if control.should_cancel() {
                tracing::warn!(track = job.track_index, "encode cancelled");
                return Ok(EncodeOutcome::Cancelled(sink.summary()));
            }
            control.report_progress(job.progress);

            for symbol in TrackSampler::new(image, job.mapping, &job.ring(), dither) {
                sink.push(symbol)?;
            }
            for _ in 0..job.padding {
                sink.push(PALETTE[0])?;
            }
            sink.end_track();
        }

        let (summary, _) = sink.finish()?;
        control.report_progress(100);
        tracing::info!(
            tracks = summary.tracks,
            symbols = summary.symbols,
            bytes = summary.bytes_written,
            "sequential encode finished"
        );
        Ok(EncodeOutcome::Completed(summary))
    }
}
