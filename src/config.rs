//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\music-catalog\config.toml
//! - macOS: ~/Library/Application Support/music-catalog/config.toml
//! - Linux: ~/.config/music-catalog/config.toml
//!
//! The file only supplies defaults. `MUSIC_DB` / `MUSIC_DIR` and command-line
//! flags always win; see [`Settings::resolve`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Catalog and audio locations
    pub library: LibraryConfig,

    /// Batch tagging settings
    pub tagging: TaggingConfig,

    /// External tool locations
    pub tools: ToolsConfig,
}

/// Catalog and audio file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Path to the catalog JSON document
    pub catalog: Option<PathBuf>,

    /// Directory holding one audio file per song
    pub music_dir: Option<PathBuf>,

    /// Container extension of every audio file
    pub extension: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            catalog: None,
            music_dir: None,
            extension: "m4a".to_string(),
        }
    }
}

/// Batch tagging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggingConfig {
    /// Default worker count for batch runs
    pub workers: usize,

    /// Where run logs and failure reports go
    pub log_dir: Option<PathBuf>,
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            log_dir: None,
        }
    }
}

/// External tool binaries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffprobe: String,
    pub ffmpeg: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffprobe: "ffprobe".to_string(),
            ffmpeg: "ffmpeg".to_string(),
        }
    }
}

/// Per-invocation switches threaded through the tagging pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Echo tool arguments and field dumps
    pub verbose: bool,
    /// Report what would change without touching any file
    pub dry_run: bool,
}

/// Fully resolved settings for one command.
#[derive(Debug, Clone)]
pub struct Settings {
    pub catalog: PathBuf,
    pub music_dir: PathBuf,
    pub extension: String,
    pub workers: usize,
    pub log_dir: PathBuf,
    pub tools: ToolsConfig,
    pub options: RunOptions,
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub catalog: Option<PathBuf>,
    pub music_dir: Option<PathBuf>,
    pub options: RunOptions,
}

impl Settings {
    /// Merge command-line overrides over the config file.
    pub fn resolve(overrides: Overrides, config: Config) -> Result<Self> {
        let catalog = overrides
            .catalog
            .or(config.library.catalog)
            .ok_or_else(|| Error::config("catalog path not set (use --db or MUSIC_DB)"))?;
        let music_dir = overrides
            .music_dir
            .or(config.library.music_dir)
            .ok_or_else(|| Error::config("music directory not set (use --music-dir or MUSIC_DIR)"))?;
        let log_dir = config
            .tagging
            .log_dir
            .or_else(default_log_dir)
            .ok_or_else(|| Error::config("could not determine a log directory"))?;

        Ok(Self {
            catalog,
            music_dir,
            extension: config.library.extension,
            workers: config.tagging.workers,
            log_dir,
            tools: config.tools,
            options: overrides.options,
        })
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("music-catalog"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// `~/.log`, where batch runs drop their artifacts by default
pub fn default_log_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|d| d.join(".log"))
}

/// Load configuration from the default location
pub fn load() -> Config {
    match config_path() {
        Some(path) => load_from(&path),
        None => {
            tracing::warn!("Could not determine config directory, using defaults");
            Config::default()
        }
    }
}

/// Load configuration from `path`
///
/// Returns default config if file doesn't exist or can't be parsed.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load_from(path: &Path) -> Config {
    if !path.exists() {
        tracing::debug!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::debug!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Save configuration to `path`
///
/// Creates the parent directory if it doesn't exist.
pub fn save_to(config: &Config, path: &Path) -> std::result::Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================
