//! Catalog-to-file tag synchronization.
//!
//! Each song goes through the same pipeline:
//!
//! ```text
//! probe file tags ──┐
//!                   ├─> diff ──> empty?  ──> Skipped
//! catalog fields ───┘            dry run ──> DryRun (print assignments)
//!                                otherwise ─> re-encode to temp, rename ──> Tagged | Failed
//! ```
//!
//! [`Tagger::tag_one`] runs it for a single song and propagates errors.
//! [`Tagger::tag_song`] contains errors as [`Outcome::Failed`], and
//! [`Tagger::run`] applies it to a batch on a bounded worker pool.

mod coordinator;
mod diff;
mod probe;
mod writer;

use std::fmt;
use std::path::PathBuf;

use crate::config::{RunOptions, Settings};
use crate::error::Result;
use crate::media::{MediaTool, TagAssignment};
use crate::model::Song;

pub use coordinator::{Failure, Summary};
pub use diff::{TagDiff, diff};
pub use probe::normalize;
pub use writer::assignments;

/// Result of one pass of the pipeline over one song.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// File tags already match the catalog
    Skipped,
    /// Dry run: these assignments would have been written
    DryRun(Vec<TagAssignment>),
    /// These assignments were written
    Tagged(Vec<TagAssignment>),
    /// Probing or writing failed; carries the tool's diagnostics
    Failed(String),
}

impl Outcome {
    /// Short label used in logs and progress output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::DryRun(_) => "dry_run",
            Self::Tagged(_) => "tagged",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Synchronizes embedded tags of the songs in one music directory.
#[derive(Debug)]
pub struct Tagger<T> {
    tool: T,
    music_dir: PathBuf,
    extension: String,
    options: RunOptions,
}

impl<T: MediaTool> Tagger<T> {
    pub fn new(
        tool: T,
        music_dir: impl Into<PathBuf>,
        extension: impl Into<String>,
        options: RunOptions,
    ) -> Self {
        Self {
            tool,
            music_dir: music_dir.into(),
            extension: extension.into(),
            options,
        }
    }

    pub fn from_settings(tool: T, settings: &Settings) -> Self {
        Self::new(
            tool,
            &settings.music_dir,
            &settings.extension,
            settings.options,
        )
    }

    #[cfg(test)]
    pub fn tool(&self) -> &T {
        &self.tool
    }

    /// Path of the song's audio file.
    pub fn song_path(&self, song: &Song) -> PathBuf {
        self.music_dir.join(song.file_name(&self.extension))
    }

    /// Where the encoder writes before the rename.
    fn temp_path(&self, song: &Song) -> PathBuf {
        self.music_dir
            .join(format!("{}.tmp.{}", song.id, self.extension))
    }

    /// Run the pipeline for one song, propagating probe and write failures.
    pub fn tag_one(&self, song: &Song) -> Result<Outcome> {
        let file_fields = self.probe(song)?;
        let catalog_fields = song.field_values();
        tracing::debug!(id = %song.id, ?file_fields, "Probed file tags");
        tracing::debug!(id = %song.id, ?catalog_fields, "Catalog fields");

        let changed = diff(&catalog_fields, &file_fields);
        if changed.is_empty() {
            return Ok(Outcome::Skipped);
        }
        self.apply(song, &changed)
    }

    /// Run the pipeline for one song inside a batch; failures become
    /// [`Outcome::Failed`].
    pub fn tag_song(&self, song: &Song) -> Outcome {
        match self.tag_one(song) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(id = %song.id, error = %e, "Tagging failed");
                Outcome::Failed(e.detail())
            }
        }
    }
}
