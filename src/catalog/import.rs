//! Bulk tag imports.
//!
//! An import file has one song per line:
//!
//! ```text
//! 3F2A-...-9C -$- Artist -@- Title -#- tag1, tag2
//! ```
//!
//! Artist and title are informational; only the id and tags are used.

use std::collections::BTreeSet;

use crate::model::{Catalog, Song, split_tags};

/// One parsed import line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportLine {
    pub id: String,
    pub artist: String,
    pub title: String,
    pub tags: Vec<String>,
}

/// Parse a single import line. Returns `None` for malformed lines.
pub fn parse_line(line: &str) -> Option<ImportLine> {
    let (id, rest) = line.split_once("-$-")?;
    let (artist, rest) = rest.split_once("-@-")?;
    let (title, tags) = rest.split_once("-#-")?;

    let id = id.trim();
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_hexdigit() || c == '-') {
        return None;
    }
    let tags: Vec<String> = split_tags(tags).map(str::to_string).collect();
    if tags.is_empty() {
        return None;
    }

    Some(ImportLine {
        id: id.to_string(),
        artist: artist.trim().to_string(),
        title: title.trim().to_string(),
        tags,
    })
}

/// What an import did to the catalog.
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Records whose tags changed, in their merged state
    pub updated: Vec<Song>,
    /// 1-based numbers of malformed lines
    pub invalid: Vec<usize>,
    /// Ids not present in the catalog
    pub unknown: Vec<String>,
    /// Ids whose tags already contained every imported tag
    pub unchanged: Vec<String>,
}

/// Merge every line of `text` into `catalog`.
///
/// Blank lines are ignored. The catalog is modified in memory only.
pub fn apply(catalog: &mut Catalog, text: &str) -> ImportReport {
    let mut report = ImportReport::default();
    let mut changed = BTreeSet::new();

    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let Some(entry) = parse_line(line) else {
            tracing::debug!(line = idx + 1, "Invalid import line");
            report.invalid.push(idx + 1);
            continue;
        };
        let Some(song) = catalog.get_mut(&entry.id) else {
            report.unknown.push(entry.id);
            continue;
        };

        if song.add_tags(entry.tags.iter().map(String::as_str)) {
            changed.insert(entry.id);
        } else {
            report.unchanged.push(entry.id);
        }
    }

    report.updated = changed
        .iter()
        .filter_map(|id| catalog.get(id).cloned())
        .collect();
    report
}
