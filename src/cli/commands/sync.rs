//! Re-tagging commands.

use anyhow::Context;
use std::path::Path;

use super::{ffmpeg_tagger, open_store};
use crate::catalog::Filter;
use crate::config::Settings;
use crate::error::Error;
use crate::model::normalize_id;

/// Sync file tags from the catalog for every song (or every tagged song)
pub fn cmd_sync(
    settings: &Settings,
    workers: Option<usize>,
    tags_only: bool,
    log_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let songs = open_store(settings).select_by(|s| !tags_only || s.has_tags())?;
    println!("Found {} songs to process", songs.len());

    if songs.is_empty() {
        println!("No songs to process");
        return Ok(());
    }

    let workers = workers.unwrap_or(settings.workers);
    let log_dir = log_dir.unwrap_or(&settings.log_dir);
    if settings.options.dry_run {
        println!("\n[DRY RUN MODE - No files will be modified]\n");
    } else {
        println!("Tagging {} files with {} workers...", songs.len(), workers);
    }

    ffmpeg_tagger(settings).run(&songs, workers, Some(log_dir))?;
    Ok(())
}

/// Tag the files of songs whose `filter` field equals `item`, one at a time
pub fn cmd_mtag(settings: &Settings, item: &str, filter: &str) -> anyhow::Result<()> {
    let value = normalize_id(item);
    let songs = open_store(settings).select(&Filter::field(filter, value))?;
    if songs.is_empty() {
        return Err(Error::not_found(value).into());
    }

    let tagger = ffmpeg_tagger(settings);
    for song in &songs {
        let outcome = tagger
            .tag_one(song)
            .with_context(|| format!("Failed to tag {}", song))?;
        println!("{} - {}", song.id, outcome);
    }
    Ok(())
}
