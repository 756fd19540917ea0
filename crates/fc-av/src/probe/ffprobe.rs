//! FFprobe-based duration probe.
//!
//! Shells out to
//! `ffprobe -v error -show_entries format=duration -of default=noprint_wrappers=1:nokey=1`
//! and reads a single floating-point seconds value from stdout.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::command::ToolCommand;

/// Default probe timeout: 30 seconds.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A duration prober backed by the `ffprobe` CLI.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    /// Path to the ffprobe binary.
    ffprobe_path: PathBuf,
    timeout: Duration,
}

impl FfprobeProber {
    /// Create a new prober using the given ffprobe path.
    pub fn new(ffprobe_path: PathBuf) -> Self {
        Self {
            ffprobe_path,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the maximum time a probe may take.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Probe the container duration of `path` in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`fc_core::Error::Probe`] if ffprobe cannot be run, exits
    /// non-zero, or prints anything other than a positive number of seconds.
    pub async fn duration(&self, path: &Path) -> fc_core::Result<f64> {
        let mut cmd = ToolCommand::new(self.ffprobe_path.clone());
        cmd.timeout(self.timeout);
        cmd.args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ]);
        cmd.arg(path.to_string_lossy().as_ref());

        let output = cmd
            .execute()
            .await
            .map_err(|e| fc_core::Error::Probe(e.to_string()))?;

        parse_duration(&output.stdout).ok_or_else(|| {
            fc_core::Error::Probe(format!(
                "unexpected ffprobe output for {}: {:?}",
                path.display(),
                output.stdout.trim()
            ))
        })
    }
}

/// Parse ffprobe's bare duration output. Only a finite, positive number is a
/// usable duration; `N/A`, empty output and zero are not.
pub fn parse_duration(stdout: &str) -> Option<f64> {
    stdout
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d > 0.0)
}
