//! CLI command definitions and dispatch.
//!
//! Each group of subcommands lives in its own submodule:
//! - `sync`: batch and filtered re-tagging of audio files
//! - `records`: read-only views of the catalog and of file tags
//! - `edit`: catalog edits (tags, marks, tag imports)
//! - `library`: music directory housekeeping and tool checks

mod edit;
mod library;
mod records;
mod sync;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::catalog::CatalogStore;
use crate::config::{self, Config, Overrides, RunOptions, Settings};
use crate::media::Ffmpeg;
use crate::tagging::Tagger;

pub use edit::{cmd_import_tags, cmd_mark, cmd_tag};
pub use library::{cmd_check_tools, cmd_cruft, cmd_init_config};
pub use records::{cmd_filter, cmd_probe, cmd_show};
pub use sync::{cmd_mtag, cmd_sync};

/// Music catalog CLI
#[derive(Parser)]
#[command(name = "music", author, version, about, long_about = None)]
pub struct Cli {
    /// Print tool arguments and field dumps
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Show what would change without touching files or the catalog
    #[arg(short = 'n', long, global = true)]
    pub dry_run: bool,

    /// Catalog JSON document
    #[arg(long, env = "MUSIC_DB", global = true)]
    pub db: Option<PathBuf>,

    /// Directory holding the audio files
    #[arg(long, env = "MUSIC_DIR", global = true)]
    pub music_dir: Option<PathBuf>,

    /// Config file (default: <config dir>/music-catalog/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Sync file tags from the catalog for every song
    Sync {
        /// Parallel workers (default from config, 4)
        #[arg(short, long)]
        workers: Option<usize>,
        /// Only process songs that have tags set
        #[arg(long)]
        tags_only: bool,
        /// Where to write the run log and failure report (default ~/.log)
        #[arg(long)]
        log_dir: Option<PathBuf>,
    },
    /// Tag the files of matching songs with their catalog metadata
    Mtag {
        /// Value compared against FILTER (a file name is reduced to its id)
        item: String,
        /// Catalog field to compare, e.g. `.playlist`
        #[arg(short, long, default_value = ".id")]
        filter: String,
    },
    /// Print the current embedded tags of matching songs
    Probe {
        /// Value compared against FILTER
        item: String,
        /// Catalog field to compare
        #[arg(short, long, default_value = ".id")]
        filter: String,
    },
    /// Show the catalog records of matching songs
    Show {
        /// Value compared against FILTER
        item: String,
        /// Catalog field to compare
        #[arg(short, long, default_value = ".id")]
        filter: String,
    },
    /// Print the file names of songs in the given playlists
    Filter {
        /// Comma separated playlist names
        #[arg(short, long)]
        playlists: String,
    },
    /// Add tags to a song and re-tag its file
    Tag {
        /// Song id or file name
        #[arg(short, long)]
        song_id: String,
        /// Tags, `<tag>[, <tag>]*`
        #[arg(required = true)]
        tags: Vec<String>,
    },
    /// Mark a song with a note
    Mark {
        /// Song id or file name
        #[arg(short, long)]
        song_id: String,
        /// Mark text (read from stdin when omitted)
        #[arg(short, long)]
        text: Option<String>,
    },
    /// Import tags from a file into the catalog and the music files
    ImportTags {
        /// Lines of `ID -$- Artist -@- Title -#- tag1, tag2`
        file: PathBuf,
        /// Parallel workers for file tagging
        #[arg(short, long)]
        workers: Option<usize>,
        /// Only update the catalog, skip file tagging
        #[arg(long)]
        db_only: bool,
    },
    /// List files in the music directory that are not catalog audio files
    Cruft,
    /// Check that ffprobe and ffmpeg are installed
    CheckTools,
    /// Write a default config file
    InitConfig {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    pub fn options(&self) -> RunOptions {
        RunOptions {
            verbose: self.verbose,
            dry_run: self.dry_run,
        }
    }

    fn load_config(&self) -> Config {
        match &self.config {
            Some(path) => config::load_from(path),
            None => config::load(),
        }
    }

    fn overrides(&self) -> Overrides {
        Overrides {
            catalog: self.db.clone(),
            music_dir: self.music_dir.clone(),
            options: self.options(),
        }
    }
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let config = cli.load_config();
    let settings = || -> anyhow::Result<Settings> {
        let settings = Settings::resolve(cli.overrides(), config.clone())?;
        tracing::debug!(?settings, "Resolved settings");
        Ok(settings)
    };

    match &cli.command {
        Commands::Sync {
            workers,
            tags_only,
            log_dir,
        } => cmd_sync(&settings()?, *workers, *tags_only, log_dir.as_deref()),
        Commands::Mtag { item, filter } => cmd_mtag(&settings()?, item, filter),
        Commands::Probe { item, filter } => cmd_probe(&settings()?, item, filter),
        Commands::Show { item, filter } => cmd_show(&settings()?, item, filter),
        Commands::Filter { playlists } => cmd_filter(&settings()?, playlists),
        Commands::Tag { song_id, tags } => cmd_tag(&settings()?, song_id, tags),
        Commands::Mark { song_id, text } => cmd_mark(&settings()?, song_id, text.as_deref()),
        Commands::ImportTags {
            file,
            workers,
            db_only,
        } => cmd_import_tags(&settings()?, file, *workers, *db_only),
        Commands::Cruft => cmd_cruft(&settings()?),
        Commands::CheckTools => cmd_check_tools(&config.tools),
        Commands::InitConfig { force } => cmd_init_config(cli.config.as_deref(), *force),
    }
}

// ============================================================================
// Shared helper functions
// ============================================================================

pub(crate) fn open_store(settings: &Settings) -> CatalogStore {
    CatalogStore::new(&settings.catalog, &settings.extension)
}

pub(crate) fn ffmpeg_tagger(settings: &Settings) -> Tagger<Ffmpeg> {
    Tagger::from_settings(Ffmpeg::from_config(&settings.tools), settings)
}

/// Print installation instructions for ffmpeg
pub(crate) fn print_ffmpeg_install_instructions() {
    eprintln!("Install FFmpeg (provides ffprobe and ffmpeg):");
    eprintln!("  Windows: winget install Gyan.FFmpeg");
    eprintln!("  macOS:   brew install ffmpeg");
    eprintln!("  Linux:   apt install ffmpeg");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "music", "sync", "-n", "--workers", "8", "--db", "/tmp/db.json",
        ])
        .unwrap();
        assert!(cli.dry_run);
        assert_eq!(cli.db.as_deref(), Some(std::path::Path::new("/tmp/db.json")));
        assert!(matches!(
            cli.command,
            Commands::Sync {
                workers: Some(8),
                tags_only: false,
                ..
            }
        ));
    }

    #[test]
    fn test_filter_defaults_to_id() {
        let cli = Cli::try_parse_from(["music", "show", "abc.m4a"]).unwrap();
        match cli.command {
            Commands::Show { item, filter } => {
                assert_eq!(item, "abc.m4a");
                assert_eq!(filter, ".id");
            }
            _ => panic!("expected show"),
        }
    }

    #[test]
    fn test_tag_requires_tags() {
        assert!(Cli::try_parse_from(["music", "tag", "-s", "abc"]).is_err());
        let cli = Cli::try_parse_from(["music", "tag", "-s", "abc", "rock,", "live"]).unwrap();
        match cli.command {
            Commands::Tag { song_id, tags } => {
                assert_eq!(song_id, "abc");
                assert_eq!(tags, vec!["rock,", "live"]);
            }
            _ => panic!("expected tag"),
        }
    }

    #[test]
    fn test_overrides_carry_options() {
        let cli = Cli::try_parse_from(["music", "-v", "--music-dir", "/m", "cruft"]).unwrap();
        let overrides = cli.overrides();
        assert!(overrides.options.verbose);
        assert!(!overrides.options.dry_run);
        assert_eq!(overrides.music_dir, Some(PathBuf::from("/m")));
    }
}
