//! Catalog persistence.
//!
//! The [`CatalogStore`] owns the catalog JSON document. Every other component
//! goes through it; nothing else opens the document directly.
//!
//! # Atomicity
//!
//! [`CatalogStore::save`] writes a complete snapshot to a temporary file in the
//! catalog's directory, syncs it, and renames it over the canonical path. A
//! reader sees either the old document or the new one, never a partial write.
//! Read-modify-write helpers such as [`CatalogStore::append`] assume a single
//! writer process.

pub mod import;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result, ResultExt};
use crate::model::{Catalog, Song, normalize_id};

/// Selects a subset of the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Songs whose `field` equals `value` exactly
    Field { field: String, value: String },
    /// Songs whose playlist is one of the given names
    Playlists(Vec<String>),
}

impl Filter {
    /// Value-equality filter. Accepts jq-style field names (`.playlist`).
    pub fn field(expr: &str, value: impl Into<String>) -> Self {
        Self::Field {
            field: expr.trim().trim_start_matches('.').to_string(),
            value: value.into(),
        }
    }

    /// Playlist filter from a comma separated list.
    pub fn playlists(list: &str) -> Self {
        Self::Playlists(
            list.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn matches(&self, song: &Song) -> bool {
        match self {
            Self::Field { field, value } => song.get(field).as_deref() == Some(value.as_str()),
            Self::Playlists(names) => song
                .playlist
                .as_ref()
                .is_some_and(|p| names.iter().any(|n| n == p)),
        }
    }

    /// Apply the filter to an already loaded catalog.
    pub fn apply(&self, catalog: &Catalog) -> Vec<Song> {
        catalog.values().filter(|s| self.matches(s)).cloned().collect()
    }
}

/// Owner of the catalog document.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    path: PathBuf,
    extension: String,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            extension: extension.into(),
        }
    }

    /// Load and parse the full catalog.
    pub fn read(&self) -> Result<Catalog> {
        let contents = std::fs::read_to_string(&self.path)
            .with_context(format!("Failed to read catalog {}", self.path.display()))?;
        let catalog: Catalog =
            serde_json::from_str(&contents).map_err(|e| Error::corrupt(&self.path, e))?;
        tracing::debug!(path = %self.path.display(), songs = catalog.len(), "Loaded catalog");
        Ok(catalog)
    }

    /// Replace the catalog document with `catalog`.
    ///
    /// `label` only names the temporary file.
    pub fn save(&self, catalog: &Catalog, label: &str) -> Result<()> {
        self.save_via(label, |file| {
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, catalog)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            Ok(())
        })?;
        tracing::info!(path = %self.path.display(), songs = catalog.len(), "Saved catalog");
        Ok(())
    }

    fn save_via(&self, label: &str, write: impl FnOnce(&mut File) -> Result<()>) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{}-", temp_label(label)))
            .suffix(".json.tmp")
            .tempfile_in(dir)
            .with_context(format!("Failed to create temp file in {}", dir.display()))?;
        tracing::debug!(temp = %tmp.path().display(), "Writing catalog snapshot");

        // On error the temp file is removed when `tmp` drops.
        write(tmp.as_file_mut())?;
        tmp.as_file().sync_all()?;

        // Temp files are created owner-only; keep the document's own mode.
        match std::fs::metadata(&self.path) {
            Ok(meta) => tmp
                .as_file()
                .set_permissions(meta.permissions())
                .with_context(format!("Failed to copy permissions of {}", self.path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(Error::Io(e).context(format!("Failed to stat {}", self.path.display())));
            }
        }
        tmp.persist(&self.path).map_err(|e| {
            Error::Io(e.error).context(format!("Failed to replace {}", self.path.display()))
        })?;
        Ok(())
    }

    /// Insert or overwrite a single record.
    pub fn append(&self, song: Song) -> Result<()> {
        tracing::debug!(id = %song.id, "Appending song to catalog");
        let mut catalog = self.read()?;
        let label = song.id.clone();
        catalog.insert(song.id.clone(), song);
        self.save(&catalog, &label)
    }

    /// Look up one record by id (or file name).
    pub fn get(&self, id: &str) -> Result<Song> {
        let id = normalize_id(id);
        self.read()?
            .remove(id)
            .ok_or_else(|| Error::not_found(id))
    }

    /// Records matching `filter`, ordered by id.
    pub fn select(&self, filter: &Filter) -> Result<Vec<Song>> {
        Ok(filter.apply(&self.read()?))
    }

    /// Records matching an arbitrary predicate, ordered by id.
    pub fn select_by(&self, predicate: impl Fn(&Song) -> bool) -> Result<Vec<Song>> {
        Ok(self
            .read()?
            .into_values()
            .filter(|s| predicate(s))
            .collect())
    }

    /// Audio file names of the records matching `filter`.
    pub fn find(&self, filter: &Filter) -> Result<Vec<String>> {
        Ok(self
            .select(filter)?
            .iter()
            .map(|s| s.file_name(&self.extension))
            .collect())
    }
}

fn temp_label(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .take(48)
        .collect();
    if cleaned.is_empty() {
        "catalog".to_string()
    } else {
        cleaned
    }
}
