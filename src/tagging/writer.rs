//! Rewriting a song's embedded tags to match the catalog.
//!
//! The encoder always writes a new file (`<id>.tmp.<ext>`) that is renamed
//! over the original only after the encoder succeeded, so an interrupted
//! encode never damages the source file.

use std::io::ErrorKind;
use std::path::Path;

use crate::error::{Error, Result};
use crate::media::{MediaTool, TagAssignment, render_assignments};
use crate::model::Song;

use super::{Outcome, TagDiff, Tagger};

/// One assignment per differing field, carrying the catalog value.
pub fn assignments(song: &Song, diff: &TagDiff) -> Vec<TagAssignment> {
    diff.iter()
        .map(|&field| TagAssignment::new(field, song.field(field).unwrap_or_default()))
        .collect()
}

impl<T: MediaTool> Tagger<T> {
    /// Bring the song's file in line with the catalog for the `diff` fields.
    pub fn write(&self, song: &Song, diff: &TagDiff) -> Outcome {
        match self.apply(song, diff) {
            Ok(outcome) => outcome,
            Err(e) => Outcome::Failed(e.detail()),
        }
    }

    pub(super) fn apply(&self, song: &Song, diff: &TagDiff) -> Result<Outcome> {
        let assignments = assignments(song, diff);
        let line = render_assignments(&assignments);

        if self.options.dry_run {
            println!("{}: {}", song.id, line);
            return Ok(Outcome::DryRun(assignments));
        }
        if self.options.verbose {
            println!("{}: {}", song.id, line);
        }

        self.rewrite(song, &assignments)?;
        tracing::debug!(id = %song.id, fields = assignments.len(), "Rewrote tags");
        Ok(Outcome::Tagged(assignments))
    }

    fn rewrite(&self, song: &Song, assignments: &[TagAssignment]) -> Result<()> {
        let file = self.song_path(song);
        let tmp = self.temp_path(song);

        // Leftover from an interrupted run
        remove_if_exists(&tmp).map_err(|e| {
            Error::write(&song.id, format!("Failed to remove stale {}: {}", tmp.display(), e))
        })?;

        if let Err(e) = self.tool.reencode_with_tags(&file, assignments, &tmp) {
            discard(&tmp);
            return Err(Error::write(&song.id, e.output()));
        }
        if !tmp.exists() {
            return Err(Error::write(
                &song.id,
                format!("Encoder did not produce {}", tmp.display()),
            ));
        }
        if let Err(e) = std::fs::rename(&tmp, &file) {
            discard(&tmp);
            return Err(Error::write(
                &song.id,
                format!("Failed to replace {}: {}", file.display(), e),
            ));
        }
        Ok(())
    }
}

fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn discard(tmp: &Path) {
    if let Err(e) = remove_if_exists(tmp) {
        tracing::warn!(path = %tmp.display(), error = %e, "Could not remove temp file");
    }
}
