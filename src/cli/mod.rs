//! Command-line interface for music-catalog.
//!
//! Every operation on the catalog and the music directory is a subcommand of
//! the `music` binary.

mod commands;

pub use commands::{Cli, Commands, run_command};
