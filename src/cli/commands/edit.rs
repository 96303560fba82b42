//! Catalog edits: tags, marks, and tag imports.

use anyhow::Context;
use std::io::{BufRead, Write};
use std::path::Path;

use super::{ffmpeg_tagger, open_store};
use crate::catalog::import;
use crate::config::Settings;
use crate::model::Song;

fn print_song(song: &Song, verbose: bool) {
    if verbose {
        println!("{:#?}", song);
    } else {
        println!("{}", song);
    }
}

/// Merge `tags` into a song's tags, save the catalog, and re-tag its file
pub fn cmd_tag(settings: &Settings, song_id: &str, tags: &[String]) -> anyhow::Result<()> {
    let options = settings.options;
    let store = open_store(settings);
    let mut song = store.get(song_id)?;
    print_song(&song, options.verbose);

    let changed = song.add_tags(tags.iter().map(String::as_str));
    println!("tags: {}", song.tags.as_deref().unwrap_or_default());

    if options.dry_run {
        println!("[DRY RUN] Catalog not saved");
    } else if changed {
        store.append(song.clone())?;
    } else {
        println!("No new tags");
    }

    let outcome = ffmpeg_tagger(settings)
        .tag_one(&song)
        .with_context(|| format!("Failed to tag {}", song))?;
    println!("{} - {}", song.id, outcome);
    Ok(())
}

/// Set a song's `marked` note, from `text` or a line read from stdin
pub fn cmd_mark(settings: &Settings, song_id: &str, text: Option<&str>) -> anyhow::Result<()> {
    let options = settings.options;
    let store = open_store(settings);
    let mut song = store.get(song_id)?;
    print_song(&song, options.verbose);

    let mark = match text {
        Some(text) => text.to_string(),
        None => prompt_mark(song.marked.as_deref())?,
    };

    if options.dry_run {
        println!("[DRY RUN] Would mark {} as {:?}", song.id, mark);
        return Ok(());
    }
    song.marked = Some(mark);
    store.append(song)?;
    Ok(())
}

fn prompt_mark(current: Option<&str>) -> anyhow::Result<String> {
    if let Some(current) = current {
        eprintln!("current: {}", current);
    }
    eprint!("marked> ");
    std::io::stderr().flush()?;

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read mark from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Import tags from `file`, save the catalog once, then re-tag the changed songs
pub fn cmd_import_tags(
    settings: &Settings,
    file: &Path,
    workers: Option<usize>,
    db_only: bool,
) -> anyhow::Result<()> {
    let options = settings.options;
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let store = open_store(settings);
    let mut catalog = store.read()?;
    let report = import::apply(&mut catalog, &text);

    for line in &report.invalid {
        println!("Skipping line {}: invalid format", line);
    }
    for id in &report.unknown {
        println!("Skipping {}: not found in catalog", id);
    }
    if options.verbose {
        for id in &report.unchanged {
            println!("{}: no new tags", id);
        }
    }
    for song in &report.updated {
        println!(
            "{}: {} => {}",
            song.id,
            song.display_name(),
            song.tags.as_deref().unwrap_or_default()
        );
    }

    let count = report.updated.len();
    if count == 0 {
        println!("\nNo songs needed updating");
        return Ok(());
    }

    if options.dry_run {
        println!("\n[DRY RUN] Would update {} songs", count);
    } else {
        store.save(&catalog, "import-tags")?;
    }

    if db_only {
        println!("\nUpdated {} songs in catalog (skipped file tagging)", count);
        return Ok(());
    }

    let workers = workers.unwrap_or(settings.workers);
    println!("\nTagging {} files with {} workers...", count, workers);
    ffmpeg_tagger(settings).run(&report.updated, workers, Some(&settings.log_dir))?;
    Ok(())
}
