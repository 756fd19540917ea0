//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! tool overrides and transcode defaults. Every section defaults sensibly so
//! a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub transcode: TranscodeConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str).map_err(|e| Error::Config(format!("parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Load configuration from a file that must exist and parse.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for (name, path) in [
            ("tools.ffmpeg_path", &self.tools.ffmpeg_path),
            ("tools.ffprobe_path", &self.tools.ffprobe_path),
        ] {
            if let Some(p) = path {
                if !p.exists() {
                    warnings.push(format!(
                        "{name} {} does not exist; falling back to PATH",
                        p.display()
                    ));
                }
            }
        }

        let t = &self.transcode;
        for (name, value) in [
            ("transcode.video_bitrate", &t.video_bitrate),
            ("transcode.audio_bitrate", &t.audio_bitrate),
            ("transcode.audio_only_bitrate", &t.audio_only_bitrate),
        ] {
            if !is_bitrate(value) {
                warnings.push(format!("{name} '{value}' does not look like a bitrate"));
            }
        }

        if t.gif_fps == 0 {
            warnings.push("transcode.gif_fps is 0; ffmpeg will reject it".into());
        }
        if t.gif_width == 0 {
            warnings.push("transcode.gif_width is 0; ffmpeg will reject it".into());
        }
        if t.timeout_secs == Some(0) {
            warnings.push("transcode.timeout_secs is 0; every job will time out".into());
        }

        warnings
    }
}

/// Accepts ffmpeg bitrate notation: digits with an optional `k`/`M` suffix.
fn is_bitrate(s: &str) -> bool {
    let digits = s.trim_end_matches(['k', 'K', 'm', 'M']);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

/// Defaults applied when a conversion request does not override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeConfig {
    /// Video bitrate for video containers.
    pub video_bitrate: String,
    /// Audio bitrate for video containers.
    pub audio_bitrate: String,
    /// Audio bitrate for audio-only outputs.
    pub audio_only_bitrate: String,
    /// x264 preset for video containers.
    pub preset: String,
    pub gif_fps: u32,
    pub gif_width: u32,
    /// Upper bound for the duration probe.
    pub probe_timeout_secs: u64,
    /// Upper bound for one transcode. `None` leaves the run unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Reject unknown output formats instead of using the generic video
    /// defaults.
    pub strict_formats: bool,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            video_bitrate: "1000k".into(),
            audio_bitrate: "128k".into(),
            audio_only_bitrate: "192k".into(),
            preset: "fast".into(),
            gif_fps: 10,
            gif_width: 480,
            probe_timeout_secs: 30,
            timeout_secs: None,
            strict_formats: false,
        }
    }
}
