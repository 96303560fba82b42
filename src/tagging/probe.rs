//! Reading a song's current embedded tags.

use crate::error::{Error, Result};
use crate::media::{MediaTool, RawTags};
use crate::model::{CatalogField, FieldValues, Song};

use super::Tagger;

/// Translate raw tag names into catalog fields, dropping unmapped tags.
pub fn normalize(raw: &RawTags) -> FieldValues {
    raw.iter()
        .filter_map(|(tag, value)| CatalogField::from_tag_name(tag).map(|f| (f, value.clone())))
        .collect()
}

impl<T: MediaTool> Tagger<T> {
    /// The raw tag block of the song's file.
    pub fn probe_raw(&self, song: &Song) -> Result<RawTags> {
        let path = self.song_path(song);
        self.tool
            .probe_tags(&path)
            .map_err(|e| Error::probe(&song.id, e.output()))
    }

    /// The song's file tags, in catalog field names.
    pub fn probe(&self, song: &Song) -> Result<FieldValues> {
        self.probe_raw(song).map(|raw| normalize(&raw))
    }
}
