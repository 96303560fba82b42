//! Access to the embedded tags of audio files.
//!
//! The tagging pipeline never shells out directly. It talks to a [`MediaTool`]
//! with two capabilities: read a file's tag block, and produce a re-tagged copy
//! of a file. [`Ffmpeg`] is the production implementation; tests substitute a
//! fake that keeps its "tags" in plain files.

mod ffmpeg;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::model::CatalogField;

pub use ffmpeg::Ffmpeg;

/// Tag block as reported by the tool, keyed by embedded tag name.
pub type RawTags = BTreeMap<String, String>;

/// One tag to set on a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagAssignment {
    pub field: CatalogField,
    pub value: String,
}

impl TagAssignment {
    pub fn new(field: CatalogField, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }

    /// Embedded tag name for this assignment.
    pub fn tag_name(&self) -> &'static str {
        self.field.tag_name()
    }

    /// `tag=value`, unquoted, as passed to the encoder.
    pub fn to_arg(&self) -> String {
        format!("{}={}", self.tag_name(), self.value)
    }
}

impl fmt::Display for TagAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match shlex::try_quote(&self.value) {
            Ok(quoted) => write!(f, "-metadata {}={}", self.tag_name(), quoted),
            Err(_) => write!(f, "-metadata {}={:?}", self.tag_name(), self.value),
        }
    }
}

/// Render assignments as a shell-safe argument line for display.
pub fn render_assignments(assignments: &[TagAssignment]) -> String {
    assignments
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Errors reported by a media tool invocation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ToolError {
    #[error("{tool} could not be started: {message}")]
    Spawn { tool: String, message: String },

    #[error("{tool} exited with {status}: {output}")]
    Failed {
        tool: String,
        status: String,
        output: String,
    },

    #[error("{tool} produced unreadable output: {message}")]
    InvalidOutput { tool: String, message: String },

    #[error("{tool} did not produce {path}")]
    MissingOutput { tool: String, path: PathBuf },
}

impl ToolError {
    /// The raw diagnostic text, for failure reports.
    pub fn output(&self) -> String {
        match self {
            Self::Failed { output, .. } if !output.trim().is_empty() => output.trim().to_string(),
            other => other.to_string(),
        }
    }
}

/// Reads and rewrites embedded tags.
///
/// Both calls block until the underlying tool finishes. Implementations must
/// be shareable across tagging workers.
pub trait MediaTool: Send + Sync {
    /// Read the tag block of `path`. A file without tags yields an empty map.
    fn probe_tags(&self, path: &Path) -> Result<RawTags, ToolError>;

    /// Write a copy of `input` to `output` with `assignments` applied.
    fn reencode_with_tags(
        &self,
        input: &Path,
        assignments: &[TagAssignment],
        output: &Path,
    ) -> Result<(), ToolError>;
}
