mod boundary;
mod cli;
mod io;
mod logging;
mod outside;
mod pipeline;
mod result;
mod types;

use std::time::Duration;

use clap::Parser;
use miette::{Context, IntoDiagnostic};
use tracing::Level;

use crate::{
    cli::Args,
    outside::{Ffmpeg, Ytdl},
    pipeline::ClipPipeline,
    types::RawClipRequest,
};

fn main() -> miette::Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    logging::init_logging(level)?;

    // Make sure the clips directory exists before any request runs
    std::fs::create_dir_all(&args.clips_dir)
        .into_diagnostic()
        .wrap_err("Could not create clips directory")?;

    let (ytdl, ffmpeg) = load_external_tools(args.tool_deadline())?;

    let pipeline = ClipPipeline::new(&ytdl, &ffmpeg, &args.clips_dir, &args.public_prefix);
    let request = RawClipRequest {
        url: args.url,
        start: args.start,
        end: args.end,
    };

    let response = boundary::handle(&pipeline, &request);
    println!(
        "{}",
        serde_json::to_string_pretty(&response).into_diagnostic()?
    );

    if response.is_failure() {
        std::process::exit(1);
    }
    Ok(())
}

/// Load the external tool handles.
///
/// Probing an external program is not instantaneous, so both probes run
/// concurrently.
fn load_external_tools(deadline: Option<Duration>) -> miette::Result<(Ytdl, Ffmpeg)> {
    let ytdl_thread = std::thread::spawn(move || Ytdl::new(deadline));
    let ffmpeg_thread = std::thread::spawn(move || Ffmpeg::new(deadline));

    let ytdl = ytdl_thread
        .join()
        .expect("Could not join thread")
        .map_err(miette::Report::from)?;
    let ffmpeg = ffmpeg_thread
        .join()
        .expect("Could not join thread")
        .map_err(miette::Report::from)?;

    Ok((ytdl, ffmpeg))
}
