//! Core data models for the music catalog.
//!
//! Defines the [`Song`] record, the [`Catalog`] mapping, and the static
//! [`CatalogField`] mapping between catalog field names and embedded tag names.
//!
//! # Catalog Document
//!
//! The catalog is a single JSON object keyed by song id:
//!
//! ```json
//! {
//!   "3f2a...": { "id": "3f2a...", "artist": "X", "name": "Y", "playlist": "Z", "tags": "a,b" }
//! }
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The full catalog, keyed by song id.
pub type Catalog = BTreeMap<String, Song>;

/// Catalog field values for the mapped fields only.
pub type FieldValues = BTreeMap<CatalogField, String>;

/// A song record in the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Song {
    /// Unique id, also the audio file's base name
    pub id: String,
    #[serde(
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub artist: Option<String>,
    /// Song title
    #[serde(
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    /// Album or collection grouping
    #[serde(
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub playlist: Option<String>,
    /// Comma-joined labels. Legacy documents may hold a JSON array.
    #[serde(
        default,
        deserialize_with = "deserialize_tags",
        skip_serializing_if = "Option::is_none"
    )]
    pub tags: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub marked: Option<String>,
    /// Provenance (e.g. "ytdl")
    #[serde(
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub from: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub url: Option<String>,
    /// Fields this version doesn't know about, kept so saves never drop data.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Song {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// The catalog value of a mapped field.
    pub fn field(&self, field: CatalogField) -> Option<&str> {
        match field {
            CatalogField::Artist => self.artist.as_deref(),
            CatalogField::Name => self.name.as_deref(),
            CatalogField::Playlist => self.playlist.as_deref(),
            CatalogField::Tags => self.tags.as_deref(),
        }
    }

    /// The mapped fields present on this record.
    pub fn field_values(&self) -> FieldValues {
        CatalogField::ALL
            .iter()
            .filter_map(|&f| self.field(f).map(|v| (f, v.to_string())))
            .collect()
    }

    /// Look up any field by its JSON name, including unknown ones.
    ///
    /// Non-string values are rendered as JSON text.
    pub fn get(&self, name: &str) -> Option<String> {
        let known = match name {
            "id" => Some(self.id.as_str()),
            "artist" => self.artist.as_deref(),
            "name" => self.name.as_deref(),
            "playlist" => self.playlist.as_deref(),
            "tags" => self.tags.as_deref(),
            "marked" => self.marked.as_deref(),
            "from" => self.from.as_deref(),
            "url" => self.url.as_deref(),
            _ => {
                return self.extra.get(name).and_then(|v| match v {
                    serde_json::Value::Null => None,
                    serde_json::Value::String(s) => Some(s.clone()),
                    other => Some(other.to_string()),
                });
            }
        };
        known.map(str::to_string)
    }

    /// Whether the record carries at least one tag.
    pub fn has_tags(&self) -> bool {
        self.tags.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    /// Merge `new_tags` into the record's tags.
    ///
    /// Returns `true` if the tags changed.
    pub fn add_tags<'a>(&mut self, new_tags: impl IntoIterator<Item = &'a str>) -> bool {
        let merged = merge_tags(self.tags.as_deref(), new_tags);
        if self.tags.as_deref() == Some(merged.as_str()) {
            return false;
        }
        self.tags = Some(merged);
        true
    }

    /// `Artist - Title`, with placeholders for missing values.
    pub fn display_name(&self) -> String {
        format!(
            "{} - {}",
            self.artist.as_deref().unwrap_or("?"),
            self.name.as_deref().unwrap_or("?")
        )
    }

    /// File name of the song's audio file.
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.id, extension)
    }
}

impl fmt::Display for Song {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {}",
            self.playlist.as_deref().unwrap_or("?"),
            self.display_name()
        )
    }
}

/// Accept numbers and booleans as their text form (`1999` -> `"1999"`).
fn deserialize_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(v @ (serde_json::Value::Number(_) | serde_json::Value::Bool(_))) => Some(v.to_string()),
        Some(other) => {
            return Err(D::Error::custom(format!(
                "expected a string, number or boolean, found {}",
                other
            )));
        }
    })
}

fn deserialize_tags<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TagsRepr {
        Text(String),
        List(Vec<String>),
    }

    Ok(match Option::<TagsRepr>::deserialize(deserializer)? {
        None => None,
        Some(TagsRepr::Text(s)) => Some(s),
        Some(TagsRepr::List(list)) => Some(merge_tags(None, list.iter().map(String::as_str))),
    })
}

/// Split comma-joined tags, trimming and dropping empties.
pub fn split_tags(tags: &str) -> impl Iterator<Item = &str> {
    tags.split(',').map(str::trim).filter(|t| !t.is_empty())
}

/// Merge tags, keeping first-seen order and dropping duplicates.
pub fn merge_tags<'a>(existing: Option<&str>, new_tags: impl IntoIterator<Item = &'a str>) -> String {
    let mut merged: Vec<String> = Vec::new();
    let mut push = |tag: &str| {
        if !merged.iter().any(|t| t == tag) {
            merged.push(tag.to_string());
        }
    };
    existing.into_iter().flat_map(split_tags).for_each(&mut push);
    for new in new_tags {
        split_tags(new).for_each(&mut push);
    }
    merged.join(",")
}

/// Turn a file name or id argument into a song id (`abc.m4a` -> `abc`).
pub fn normalize_id(item: &str) -> &str {
    item.split_once('.').map_or(item, |(id, _)| id)
}

/// Catalog fields that are mirrored into embedded tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CatalogField {
    Artist,
    Name,
    Playlist,
    Tags,
}

impl CatalogField {
    pub const ALL: [CatalogField; 4] = [Self::Artist, Self::Name, Self::Playlist, Self::Tags];

    /// Field name in the catalog document.
    pub fn name(self) -> &'static str {
        match self {
            Self::Artist => "artist",
            Self::Name => "name",
            Self::Playlist => "playlist",
            Self::Tags => "tags",
        }
    }

    /// Tag name inside the audio container.
    pub fn tag_name(self) -> &'static str {
        match self {
            Self::Artist => "artist",
            Self::Name => "title",
            Self::Playlist => "album",
            Self::Tags => "genre",
        }
    }

    /// Map an embedded tag name back to its catalog field (case-insensitive).
    pub fn from_tag_name(tag: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.tag_name().eq_ignore_ascii_case(tag))
    }
}

impl fmt::Display for CatalogField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
