//! Application-wide error types.
//!
//! Library modules return [`Result`] built on the [`Error`] enum below, while
//! the CLI layer and `main` use `anyhow` for convenient error propagation.
//!
//! # Taxonomy
//!
//! - [`Error::CatalogCorrupt`]: the catalog document cannot be parsed
//! - [`Error::ProbeFailed`]: the probing tool could not read a song's tags
//! - [`Error::WriteFailed`]: the encoding tool could not rewrite a song's tags
//! - [`Error::NotFound`]: no catalog record for the requested id
//!
//! # Example
//!
//! ```ignore
//! use crate::error::{Error, Result, ResultExt};
//!
//! fn load(store: &CatalogStore) -> Result<Catalog> {
//!     store.read().with_context("while loading catalog")
//! }
//! ```

use std::path::PathBuf;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Catalog document exists but is not valid JSON
    #[error("Catalog {path} is corrupt: {source}")]
    CatalogCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Serialization error while writing JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Probing tool failed for a song
    #[error("Probe failed for {id}: {output}")]
    ProbeFailed { id: String, output: String },

    /// Encoding tool failed for a song
    #[error("Write failed for {id}: {output}")]
    WriteFailed { id: String, output: String },

    /// Song id not present in the catalog
    #[error("Song not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a catalog corruption error.
    pub fn corrupt(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::CatalogCorrupt {
            path: path.into(),
            source,
        }
    }

    /// Create a probe error.
    pub fn probe(id: impl Into<String>, output: impl Into<String>) -> Self {
        Self::ProbeFailed {
            id: id.into(),
            output: output.into(),
        }
    }

    /// Create a write error.
    pub fn write(id: impl Into<String>, output: impl Into<String>) -> Self {
        Self::WriteFailed {
            id: id.into(),
            output: output.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }

    /// The detail text recorded in failure reports.
    ///
    /// Tool failures report the raw tool output rather than the full message,
    /// since the song id is already part of the report line.
    pub fn detail(&self) -> String {
        match self {
            Self::ProbeFailed { output, .. } | Self::WriteFailed { output, .. } => {
                output.trim().to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}
