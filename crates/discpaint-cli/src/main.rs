mod cli;

use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::Parser;
use discpaint_core::encode::default_workers;
use discpaint_core::{
    encode_to_file, fit_to_disc, load_image, presets, CancelToken, DiscPreset, DitherMode,
    EncodeOutcome, EncodeParams, OutputLayout, RunControl,
};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::{info, warn};

use crate::cli::{Cli, Commands, ConvertArgs};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert(args) => convert(args),
        Commands::Presets => {
            list_presets();
            Ok(())
        }
    }
}

fn resolve_params(args: &ConvertArgs) -> anyhow::Result<EncodeParams> {
    let preset: &DiscPreset = match args.preset.as_deref() {
        Some(key) => presets::find(key).ok_or_else(|| {
            anyhow!("unknown preset '{key}' (run `discpaint presets` for the list)")
        })?,
        None => presets::default_for(args.disc_type.unwrap_or_default()),
    };

    let mut params = EncodeParams::new(
        args.tr0.unwrap_or(preset.tr0),
        args.dtr.unwrap_or(preset.dtr),
        args.r0.unwrap_or(preset.r0),
    )
    .with_disc_type(args.disc_type.unwrap_or(preset.disc_type))
    .with_seed(args.seed)
    .with_workers(args.workers.unwrap_or_else(default_workers));

    if args.mix_colors {
        params = params.with_dither(DitherMode::RandomMix);
    }
    if args.raw {
        params = params.with_layout(OutputLayout::Raw);
    }
    if let Some(total) = args.total_symbols {
        params = params.with_total_symbols(total);
    }

    params.validate().context("invalid encoding parameters")?;
    Ok(params)
}

/// Cancel the returned token on Ctrl-C or SIGTERM.
fn interrupt_token() -> anyhow::Result<CancelToken> {
    let token = CancelToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        if !handler_token.is_cancelled() {
            warn!("received interrupt signal, cancelling");
        }
        handler_token.cancel();
    })
    .context("failed to install interrupt handler")?;
    Ok(token)
}

fn convert(args: ConvertArgs) -> anyhow::Result<()> {
    let params = resolve_params(&args)?;

    let image = load_image(&args.input)
        .with_context(|| format!("failed to load '{}'", args.input.display()))?;
    let disc = fit_to_disc(&image, params.disc_type)
        .with_context(|| format!("failed to prepare '{}'", args.input.display()))?;

    info!(
        input = %args.input.display(),
        output = %args.output.display(),
        disc = %params.disc_type,
        workers = params.workers,
        "converting"
    );

    let progress = ProgressBar::new(100);
    progress.set_draw_target(ProgressDrawTarget::stderr());
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>3}%",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress.set_style(style);
    progress.enable_steady_tick(Duration::from_millis(100));

    let progress_handle = progress.clone();
    let mut control = RunControl::new()
        .with_token(interrupt_token()?)
        .on_progress(move |percent| {
            progress_handle.set_position(u64::from(percent));
        });

    let result = encode_to_file(&disc, &params, &args.output, &mut control)
        .with_context(|| format!("failed to write '{}'", args.output.display()));
    progress.finish_and_clear();

    match result? {
        EncodeOutcome::Completed(summary) => {
            println!(
                "Wrote {} ({} tracks, {} symbols, {} bytes)",
                args.output.display(),
                summary.tracks,
                summary.symbols,
                summary.bytes_written
            );
            Ok(())
        }
        EncodeOutcome::Cancelled(summary) => {
            eprintln!(
                "Cancelled after {} tracks, removed '{}'",
                summary.tracks,
                args.output.display()
            );
            Err(anyhow!("conversion cancelled"))
        }
    }
}

fn list_presets() {
    println!("Available disc presets:");
    println!();
    for preset in presets::all() {
        println!(
            "  {:<20} {:<4} tr0={:<10} dtr={:<11} r0={:<5} {}",
            preset.key,
            preset.disc_type.as_str(),
            preset.tr0,
            preset.dtr,
            preset.r0,
            preset.name
        );
    }
}
