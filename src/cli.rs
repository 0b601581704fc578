// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Only the run-time knobs live here (mode, worker count, output format).
// What to download (site, gallery, page count, output directory) comes from
// the settings file, see src/settings.rs.
// =============================================================================

use clap::Parser;
use std::path::PathBuf;

use crate::pool::ExecutionMode;

// #[derive(Parser)] tells clap to generate the parsing code from this struct
#[derive(Parser, Debug)]
#[command(
    name = "image-harvester",
    version = "0.1.0",
    about = "Download the images of a paginated gallery with a pool of worker threads",
    long_about = "image-harvester splits a gallery's pages between worker threads. \
                  Each worker fetches its pages either one at a time (sync) or \
                  interleaved on its own async runtime (async), and the run ends \
                  with a success/failure count."
)]
pub struct Cli {
    /// Evaluation mode: fetch pages one at a time, or interleave them
    #[arg(short, long, value_enum, default_value_t = ExecutionMode::Concurrent)]
    pub mode: ExecutionMode,

    /// Requested worker count (raised to the number of CPUs if lower)
    #[arg(short, long, default_value_t = 4)]
    pub process: usize,

    /// Settings file (JSON)
    #[arg(short, long, default_value = "settings.json")]
    pub settings: PathBuf,

    /// Maximum pages in flight per worker in async mode
    #[arg(short, long, default_value_t = 8, value_parser = clap::value_parser!(u16).range(1..))]
    pub concurrency: u16,

    /// Print the summary as JSON instead of a text line
    #[arg(long)]
    pub json: bool,
}
