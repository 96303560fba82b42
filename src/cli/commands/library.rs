//! Music directory housekeeping and tool checks.

use std::path::Path;
use walkdir::WalkDir;

use super::print_ffmpeg_install_instructions;
use crate::config::{self, Config, Settings, ToolsConfig};
use crate::media::Ffmpeg;

/// Print files in the music directory that are not catalog audio files
pub fn cmd_cruft(settings: &Settings) -> anyhow::Result<()> {
    for path in find_cruft(&settings.music_dir, &settings.extension) {
        println!("{}", path.display());
    }
    Ok(())
}

fn find_cruft(music_dir: &Path, extension: &str) -> Vec<std::path::PathBuf> {
    WalkDir::new(music_dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| is_cruft(e.path(), extension))
        .map(|e| e.into_path())
        .collect()
}

/// Whether `path` is neither hidden nor an `<id>.<extension>` audio file.
///
/// Ids are made of ASCII letters, digits and hyphens.
pub(crate) fn is_cruft(path: &Path, extension: &str) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return true;
    };
    if name.starts_with('.') {
        return false;
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if ext == extension => {
            stem.is_empty() || !stem.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        }
        _ => true,
    }
}

/// Check if ffprobe and ffmpeg are installed
pub fn cmd_check_tools(tools: &ToolsConfig) -> anyhow::Result<()> {
    println!("Checking media tools...\n");
    let ffmpeg = Ffmpeg::from_config(tools);
    let mut missing = false;

    match ffmpeg.ffprobe_version() {
        Some(version) => println!("✓ {}: {}", tools.ffprobe, version),
        None => {
            println!("✗ {}: NOT FOUND", tools.ffprobe);
            missing = true;
        }
    }
    match ffmpeg.ffmpeg_version() {
        Some(version) => println!("✓ {}: {}", tools.ffmpeg, version),
        None => {
            println!("✗ {}: NOT FOUND", tools.ffmpeg);
            missing = true;
        }
    }

    if missing {
        println!();
        print_ffmpeg_install_instructions();
    }
    Ok(())
}

/// Write a default config file to `path` (or the standard location)
pub fn cmd_init_config(path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config::config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?,
    };
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    config::save_to(&Config::default(), &path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
