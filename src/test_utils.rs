//! Test utilities and fixtures for music-catalog tests.
//!
//! [`TestLibrary`] lays out a catalog document and a music directory in a
//! temporary directory. [`FakeTool`] stands in for ffprobe/ffmpeg: its "audio
//! files" are small JSON documents holding a tag block and a payload, so tests
//! can inspect exactly what was written.
//!
//! # Example
//!
//! ```ignore
//! let lib = TestLibrary::with_songs(vec![song("abc", "X", "Y", "Z", Some("a,b"))]);
//! lib.add_audio("abc", &[("artist", "X"), ("genre", "a")]);
//! let tagger = lib.tagger(FakeTool::new(), RunOptions::default());
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use crate::catalog::CatalogStore;
use crate::config::RunOptions;
use crate::media::{MediaTool, RawTags, TagAssignment, ToolError};
use crate::model::{Catalog, Song};
use crate::tagging::Tagger;

const EXTENSION: &str = "m4a";

/// A catalog and music directory inside a temporary directory.
///
/// The directory is removed when the library is dropped.
pub struct TestLibrary {
    dir: TempDir,
}

impl TestLibrary {
    /// An empty catalog (`{}`) and an empty music directory.
    pub fn empty() -> Self {
        Self::with_songs(Vec::new())
    }

    pub fn with_songs(songs: Vec<Song>) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let lib = Self { dir };
        std::fs::create_dir_all(lib.music_dir()).expect("Failed to create music directory");

        let catalog: Catalog = songs.into_iter().map(|s| (s.id.clone(), s)).collect();
        lib.store()
            .save(&catalog, "fixture")
            .expect("Failed to write fixture catalog");
        lib
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.root().join("catalog.json")
    }

    pub fn music_dir(&self) -> PathBuf {
        self.root().join("music")
    }

    /// Not created until a run log is written.
    pub fn log_dir(&self) -> PathBuf {
        self.root().join("logs")
    }

    pub fn store(&self) -> CatalogStore {
        CatalogStore::new(self.catalog_path(), EXTENSION)
    }

    pub fn tagger<T: MediaTool>(&self, tool: T, options: RunOptions) -> Tagger<T> {
        Tagger::new(tool, self.music_dir(), EXTENSION, options)
    }

    /// `<music_dir>/<id>.m4a`
    pub fn audio_path(&self, id: &str) -> PathBuf {
        self.music_dir().join(format!("{}.{}", id, EXTENSION))
    }

    /// Create a fake audio file with the given embedded tags.
    pub fn add_audio(&self, id: &str, tags: &[(&str, &str)]) -> PathBuf {
        let tags = tags
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.write_audio(id, Some(tags))
    }

    /// Create a fake audio file with no tag block at all.
    pub fn add_untagged_audio(&self, id: &str) -> PathBuf {
        self.write_audio(id, None)
    }

    fn write_audio(&self, id: &str, tags: Option<RawTags>) -> PathBuf {
        let path = self.audio_path(id);
        let file = FakeAudio {
            tags,
            audio: format!("audio payload of {}", id),
        };
        write_fake_audio(&path, &file).expect("Failed to write fake audio");
        path
    }
}

/// A catalog record with the four mapped fields set.
pub fn song(id: &str, artist: &str, name: &str, playlist: &str, tags: Option<&str>) -> Song {
    Song {
        artist: Some(artist.to_string()),
        name: Some(name.to_string()),
        playlist: Some(playlist.to_string()),
        tags: tags.map(str::to_string),
        ..Song::new(id)
    }
}

/// On-disk layout of a fake audio file.
#[derive(Debug, Serialize, Deserialize)]
struct FakeAudio {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tags: Option<RawTags>,
    audio: String,
}

fn read_fake_audio(path: &Path) -> Result<FakeAudio, String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| format!("{}: Invalid data found: {}", path.display(), e))
}

fn write_fake_audio(path: &Path, file: &FakeAudio) -> std::io::Result<()> {
    let text = serde_json::to_string(file).map_err(std::io::Error::other)?;
    std::fs::write(path, text)
}

/// The embedded tags of a fake audio file (empty if it has no tag block).
pub fn read_fake_tags(path: &Path) -> RawTags {
    read_fake_audio(path)
        .expect("Failed to read fake audio")
        .tags
        .unwrap_or_default()
}

/// In-process replacement for ffprobe/ffmpeg.
#[derive(Debug, Default)]
pub struct FakeTool {
    /// Ids whose encode fails after writing a partial output
    failing: BTreeSet<String>,
    /// Report success without writing any output
    silent: bool,
    encodes: AtomicUsize,
}

impl FakeTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for<'a>(ids: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            failing: ids.into_iter().map(str::to_string).collect(),
            ..Self::default()
        }
    }

    pub fn silent() -> Self {
        Self {
            silent: true,
            ..Self::default()
        }
    }

    /// Number of encode invocations so far.
    pub fn encode_count(&self) -> usize {
        self.encodes.load(Ordering::SeqCst)
    }
}

fn file_id(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .and_then(|n| n.split('.').next().map(str::to_string))
        .unwrap_or_default()
}

fn failed(tool: &str, output: String) -> ToolError {
    ToolError::Failed {
        tool: tool.to_string(),
        status: "exit status: 1".to_string(),
        output,
    }
}

impl MediaTool for FakeTool {
    fn probe_tags(&self, path: &Path) -> Result<RawTags, ToolError> {
        let file = read_fake_audio(path).map_err(|e| failed("ffprobe", e))?;
        Ok(file.tags.unwrap_or_default())
    }

    fn reencode_with_tags(
        &self,
        input: &Path,
        assignments: &[TagAssignment],
        output: &Path,
    ) -> Result<(), ToolError> {
        self.encodes.fetch_add(1, Ordering::SeqCst);
        if self.silent {
            return Ok(());
        }

        let mut file = read_fake_audio(input).map_err(|e| failed("ffmpeg", e))?;

        if self.failing.contains(&file_id(input)) {
            let _ = std::fs::write(output, b"partial");
            return Err(failed(
                "ffmpeg",
                format!("{}: simulated encoder failure", input.display()),
            ));
        }

        let tags: &mut BTreeMap<String, String> = file.tags.get_or_insert_with(BTreeMap::new);
        for a in assignments {
            tags.insert(a.tag_name().to_string(), a.value.clone());
        }
        write_fake_audio(output, &file).map_err(|e| failed("ffmpeg", e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CatalogField;

    #[test]
    fn test_library_layout() {
        let lib = TestLibrary::empty();
        assert!(lib.catalog_path().exists());
        assert!(lib.music_dir().is_dir());
        assert!(!lib.log_dir().exists());
        assert!(lib.store().read().unwrap().is_empty());
    }

    #[test]
    fn test_song_fixture() {
        let s = song("abc", "X", "Y", "Z", None);
        assert_eq!(s.id, "abc");
        assert_eq!(s.playlist.as_deref(), Some("Z"));
        assert!(s.tags.is_none());
    }

    #[test]
    fn test_fake_tool_roundtrip() {
        let lib = TestLibrary::empty();
        let input = lib.add_audio("abc", &[("title", "Y")]);
        let output = lib.audio_path("abc.tmp");
        let tool = FakeTool::new();

        tool.reencode_with_tags(
            &input,
            &[TagAssignment::new(CatalogField::Artist, "X")],
            &output,
        )
        .unwrap();

        let tags = tool.probe_tags(&output).unwrap();
        assert_eq!(tags["title"], "Y");
        assert_eq!(tags["artist"], "X");
        assert_eq!(tool.encode_count(), 1);
    }

    #[test]
    fn test_fake_tool_untagged_and_missing() {
        let lib = TestLibrary::empty();
        let tool = FakeTool::new();
        let untagged = lib.add_untagged_audio("abc");

        assert!(tool.probe_tags(&untagged).unwrap().is_empty());
        assert!(tool.probe_tags(&lib.audio_path("gone")).is_err());
    }

    #[test]
    fn test_fake_tool_failure_leaves_partial_output() {
        let lib = TestLibrary::empty();
        let input = lib.add_audio("abc", &[]);
        let output = lib.audio_path("abc.tmp");
        let tool = FakeTool::failing_for(["abc"]);

        let err = tool.reencode_with_tags(&input, &[], &output).unwrap_err();

        assert!(err.output().contains("simulated encoder failure"));
        assert!(output.exists());
    }
}
