//! Discpaint Core - spiral track encoder
//!
//! This crate turns an image into a stream of four-level symbols that, burnt
//! as an audio track onto a recordable disc, makes the image visible on the
//! disc's data surface. It includes image preparation, spiral geometry,
//! dithered quantization, CIRC-shaped interleaving, and sequential and
//! parallel encoders.

pub mod encode;
pub mod geometry;
pub mod interleave;
pub mod luminance;
pub mod prepare;
pub mod presets;
pub mod quantize;
pub mod sector;

pub use encode::{
    encode_to_file, CancelToken, EncodeError, EncodeOutcome, EncodeParams, EncodeSummary,
    OutputLayout, ParallelEncoder, RunControl, SequentialEncoder,
};
pub use geometry::{CanvasMapping, DiscType};
pub use prepare::{fit_to_disc, load_image, DiscImage, PrepareError};
pub use presets::DiscPreset;
pub use quantize::{DitherMode, PALETTE};
