//! [`MediaTool`] backed by the `ffprobe` and `ffmpeg` command-line tools.
//!
//! Both tools must be on `PATH` (or configured with full paths):
//! - Windows: `winget install Gyan.FFmpeg`
//! - macOS: `brew install ffmpeg`
//! - Linux: `apt install ffmpeg` or equivalent

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::process::{Command, Output};

use super::{MediaTool, RawTags, TagAssignment, ToolError};
use crate::config::ToolsConfig;

/// Shells out to `ffprobe` for reading and `ffmpeg` for rewriting tags.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    ffprobe: String,
    ffmpeg: String,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::from_config(&ToolsConfig::default())
    }
}

impl Ffmpeg {
    pub fn new(ffprobe: impl Into<String>, ffmpeg: impl Into<String>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
            ffmpeg: ffmpeg.into(),
        }
    }

    pub fn from_config(tools: &ToolsConfig) -> Self {
        Self::new(&tools.ffprobe, &tools.ffmpeg)
    }

    /// `ffprobe -version` first line, if the tool runs.
    pub fn ffprobe_version(&self) -> Option<String> {
        tool_version(&self.ffprobe)
    }

    /// `ffmpeg -version` first line, if the tool runs.
    pub fn ffmpeg_version(&self) -> Option<String> {
        tool_version(&self.ffmpeg)
    }
}

impl MediaTool for Ffmpeg {
    fn probe_tags(&self, path: &Path) -> Result<RawTags, ToolError> {
        let output = Command::new(&self.ffprobe)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(path)
            .output()
            .map_err(|e| ToolError::Spawn {
                tool: self.ffprobe.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(failed(&self.ffprobe, &output));
        }

        parse_probe_json(&String::from_utf8_lossy(&output.stdout)).map_err(|message| {
            ToolError::InvalidOutput {
                tool: self.ffprobe.clone(),
                message,
            }
        })
    }

    fn reencode_with_tags(
        &self,
        input: &Path,
        assignments: &[TagAssignment],
        output: &Path,
    ) -> Result<(), ToolError> {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-v", "warning", "-y", "-i"])
            .arg(input)
            // Copy every stream untouched; only the container metadata changes
            .args(["-map", "0", "-codec", "copy"]);
        for assignment in assignments {
            cmd.arg("-metadata").arg(assignment.to_arg());
        }
        cmd.arg(output);

        tracing::debug!(?cmd, "Running encoder");
        let result = cmd.output().map_err(|e| ToolError::Spawn {
            tool: self.ffmpeg.clone(),
            message: e.to_string(),
        })?;

        if !result.status.success() {
            return Err(failed(&self.ffmpeg, &result));
        }
        if !output.exists() {
            return Err(ToolError::MissingOutput {
                tool: self.ffmpeg.clone(),
                path: output.to_path_buf(),
            });
        }
        Ok(())
    }
}

fn failed(tool: &str, output: &Output) -> ToolError {
    let mut text = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(stdout.trim());
    }
    ToolError::Failed {
        tool: tool.to_string(),
        status: output.status.to_string(),
        output: text,
    }
}

fn tool_version(tool: &str) -> Option<String> {
    Command::new(tool)
        .arg("-version")
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| {
            String::from_utf8_lossy(&o.stdout)
                .lines()
                .next()
                .map(|l| l.trim().to_string())
        })
}

/// ffprobe `-show_format` JSON output structure
#[derive(Deserialize)]
struct ProbeOutput {
    format: Option<ProbeFormat>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    tags: BTreeMap<String, serde_json::Value>,
}

/// Parse the JSON output from ffprobe into the raw tag block.
fn parse_probe_json(json: &str) -> Result<RawTags, String> {
    let parsed: ProbeOutput =
        serde_json::from_str(json).map_err(|e| format!("Failed to parse ffprobe output: {}", e))?;

    let Some(format) = parsed.format else {
        return Ok(RawTags::new());
    };

    Ok(format
        .tags
        .into_iter()
        .map(|(k, v)| {
            let value = match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (k, value)
        })
        .collect())
}
