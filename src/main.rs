//! Music Catalog - keeps embedded audio tags in sync with a JSON catalog.
//!
//! The catalog document is the source of truth for each song's artist,
//! title, playlist and tags. Commands read and edit the catalog and rewrite
//! the tags of the audio files in the music directory to match it, using
//! `ffprobe` and `ffmpeg`.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod media;
pub mod model;
pub mod tagging;
#[cfg(test)]
pub mod test_utils;

use clap::Parser;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    let level = if args.verbose { "debug" } else { "info" };
    let directive: Directive = format!("{}={}", env!("CARGO_CRATE_NAME"), level).parse()?;
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(directive))
        .init();

    cli::run_command(&args)
}
