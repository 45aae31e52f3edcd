use std::path::PathBuf;

use clap::{Parser, Subcommand};
use discpaint_core::DiscType;

#[derive(Parser)]
#[command(
    name = "discpaint",
    version,
    about = "Turn images into audio tracks that draw on the disc surface",
    long_about = "Convert an image into a raw audio track. Burnt onto a CD or DVD, \
                  the track makes the image visible on the data side of the disc."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert an image to a burnable audio track.
    Convert(ConvertArgs),
    /// List the known disc presets.
    Presets,
}

#[derive(clap::Args)]
pub struct ConvertArgs {
    /// Source image (JPEG or PNG).
    pub input: PathBuf,

    /// Destination track file.
    #[arg(short, long, default_value = "track.raw")]
    pub output: PathBuf,

    /// Disc preset supplying tr0, dtr and r0 (see `discpaint presets`).
    #[arg(short, long)]
    pub preset: Option<String>,

    /// Disc type: cd or dvd (defaults to the preset's type).
    #[arg(short = 't', long)]
    pub disc_type: Option<DiscType>,

    /// Samples on the innermost track (overrides the preset).
    #[arg(long)]
    pub tr0: Option<f64>,

    /// Samples added per track (overrides the preset).
    #[arg(long)]
    pub dtr: Option<f64>,

    /// Radius of the innermost track in millimetres (overrides the preset).
    #[arg(long)]
    pub r0: Option<f64>,

    /// Dither with seeded random mixing instead of the ordered pattern.
    #[arg(long, default_value_t = false)]
    pub mix_colors: bool,

    /// Seed for --mix-colors.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Worker threads, 0 for the sequential encoder (defaults to CPU count, at most 8).
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Write symbols in spiral order without interleaving.
    #[arg(long, default_value_t = false)]
    pub raw: bool,

    /// Replace the disc's symbol budget.
    #[arg(long, hide = true)]
    pub total_symbols: Option<u64>,
}
