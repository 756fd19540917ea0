//! Media-domain enums for output format families.
//!
//! All enums serialize in lowercase (via `serde(rename_all = "lowercase")`) and
//! implement `Display` manually for consistent string representation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Output formats written as a video container.
pub const VIDEO_FORMATS: &[&str] = &["mp4", "avi", "mov", "mkv", "flv", "webm"];

/// Output formats that carry audio only.
pub const AUDIO_FORMATS: &[&str] = &["mp3", "aac", "ogg", "flac", "m4a", "wav"];

// ---------------------------------------------------------------------------
// FormatFamily
// ---------------------------------------------------------------------------

/// Category an output format falls into, which selects the encoding defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatFamily {
    /// Video container (mp4, mkv, webm, ...).
    Video,
    /// Audio-only output; the video stream is dropped.
    Audio,
    /// Animated GIF.
    Gif,
    /// Anything not recognized. Gets the generic video defaults.
    Unknown,
}

impl FormatFamily {
    /// Classify an output format name (case-insensitive, leading `.` ignored).
    pub fn of(format: &str) -> Self {
        let format = normalize_format(format);
        if VIDEO_FORMATS.contains(&format.as_str()) {
            Self::Video
        } else if AUDIO_FORMATS.contains(&format.as_str()) {
            Self::Audio
        } else if format == "gif" {
            Self::Gif
        } else {
            Self::Unknown
        }
    }

    pub fn is_known(self) -> bool {
        self != Self::Unknown
    }
}

impl fmt::Display for FormatFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
            Self::Gif => write!(f, "gif"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Lowercase a format name and strip a leading dot (`".MP4"` -> `"mp4"`).
pub fn normalize_format(format: &str) -> String {
    format.trim().trim_start_matches('.').to_ascii_lowercase()
}
