//! Read-only catalog and file tag views.

use super::{ffmpeg_tagger, open_store};
use crate::catalog::Filter;
use crate::config::Settings;
use crate::model::normalize_id;
use crate::tagging::normalize;

/// Pretty-print the catalog records matching `filter == item`
pub fn cmd_show(settings: &Settings, item: &str, filter: &str) -> anyhow::Result<()> {
    let songs = open_store(settings).select(&Filter::field(filter, normalize_id(item)))?;
    for song in &songs {
        println!("{}", serde_json::to_string_pretty(song)?);
    }
    if songs.is_empty() {
        eprintln!("No songs match {} == {}", filter, normalize_id(item));
    }
    Ok(())
}

/// Print the embedded tags of the files matching `filter == item`
pub fn cmd_probe(settings: &Settings, item: &str, filter: &str) -> anyhow::Result<()> {
    let songs = open_store(settings).select(&Filter::field(filter, normalize_id(item)))?;
    let tagger = ffmpeg_tagger(settings);

    for song in &songs {
        let tags = tagger.probe_raw(song)?;
        println!("{}: {}", song.id, serde_json::to_string(&tags)?);
        if settings.options.verbose {
            println!("  catalog fields: {:?}", song.field_values());
            println!("  file fields:    {:?}", normalize(&tags));
        }
    }
    Ok(())
}

/// Print `<id>.<ext>` for every song in one of `playlists`
pub fn cmd_filter(settings: &Settings, playlists: &str) -> anyhow::Result<()> {
    let filter = Filter::playlists(playlists);
    if matches!(&filter, Filter::Playlists(names) if names.is_empty()) {
        anyhow::bail!("--playlists needs at least one playlist name");
    }

    for file in open_store(settings).find(&filter)? {
        println!("{}", file);
    }
    Ok(())
}
