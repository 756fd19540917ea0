//! Shared test harness for integration tests.
//!
//! [`FakeTools`] writes stand-in `ffmpeg` and `ffprobe` shell scripts into a
//! temp directory so conversions can be driven end to end without a real
//! ffmpeg install. The fake ffmpeg records its arguments in `args.txt` next
//! to the scripts and writes a small file at the output path on success.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use fc_av::ToolRegistry;
use fc_core::config::{Config, ToolsConfig};
use tempfile::TempDir;

/// Banner line carrying a 10 second input duration.
pub const BANNER_10S: &str = "  Duration: 00:00:10.00, start: 0.000000, bitrate: 1205 kb/s";

/// An ffmpeg that reports progress at 2.5s, 5s and 7.5s of a 10s input.
pub fn ffmpeg_ok() -> String {
    ffmpeg_script(
        &[BANNER_10S],
        &["00:00:02.500000", "00:00:05.000000", "00:00:07.500000"],
        0,
    )
}

/// An ffmpeg that reports some progress then fails like a corrupt input.
pub fn ffmpeg_failing() -> String {
    ffmpeg_script(
        &[
            BANNER_10S,
            "[mov,mp4,m4a,3gp,3g2,mj2 @ 0x55d0] moov atom not found",
            "in.mp4: Invalid data found when processing input",
        ],
        &["00:00:02.500000"],
        1,
    )
}

/// Build an ffmpeg stand-in. `log` lines go to stderr first, then one
/// progress block per timemark, then `progress=end` when `exit_code` is 0.
pub fn ffmpeg_script(log: &[&str], timemarks: &[&str], exit_code: i32) -> String {
    let mut s = String::from("#!/bin/sh\n");
    s.push_str("printf '%s\\n' \"$@\" > \"$(dirname \"$0\")/args.txt\"\n");
    s.push_str("for last; do :; done\n");
    for line in log {
        s.push_str(&format!("echo '{line}' >&2\n"));
    }
    for (i, tm) in timemarks.iter().enumerate() {
        s.push_str(&format!(
            "printf 'frame={}\\nfps=25.0\\nout_time={tm}\\nspeed=2.0x\\nprogress=continue\\n' >&2\n",
            (i + 1) * 60
        ));
    }
    if exit_code == 0 {
        s.push_str("printf 'out_time=00:00:10.000000\\nprogress=end\\n' >&2\n");
        s.push_str("echo converted > \"$last\"\n");
    }
    s.push_str(&format!("exit {exit_code}\n"));
    s
}

/// An ffprobe that prints `secs` as the container duration.
pub fn ffprobe_ok(secs: &str) -> String {
    format!("#!/bin/sh\necho {secs}\n")
}

/// An ffprobe that fails the way it does on unreadable input.
pub fn ffprobe_failing() -> String {
    "#!/bin/sh\necho 'in.mp4: Invalid data found when processing input' >&2\nexit 1\n".to_string()
}

/// Temp directory holding fake tools and test media.
pub struct FakeTools {
    pub dir: TempDir,
    ffmpeg: Option<PathBuf>,
    ffprobe: Option<PathBuf>,
}

impl FakeTools {
    /// Install both tools. `None` leaves that tool absent.
    pub fn new(ffmpeg: Option<&str>, ffprobe: Option<&str>) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let ffmpeg = ffmpeg.map(|body| write_script(dir.path(), "ffmpeg", body));
        let ffprobe = ffprobe.map(|body| write_script(dir.path(), "ffprobe", body));
        Self {
            dir,
            ffmpeg,
            ffprobe,
        }
    }

    /// Tool config pointing at the fake scripts. Missing tools point at a
    /// path that does not exist.
    pub fn tools_config(&self) -> ToolsConfig {
        ToolsConfig {
            ffmpeg_path: Some(self.ffmpeg.clone().unwrap_or_else(|| self.path("no-ffmpeg"))),
            ffprobe_path: Some(self.ffprobe.clone().unwrap_or_else(|| self.path("no-ffprobe"))),
        }
    }

    /// Registry holding only the fake tools.
    pub fn registry(&self) -> ToolRegistry {
        let mut registry = ToolRegistry::default();
        if let Some(p) = &self.ffmpeg {
            registry.register("ffmpeg", p.clone());
        }
        if let Some(p) = &self.ffprobe {
            registry.register("ffprobe", p.clone());
        }
        registry
    }

    /// Write a JSON config file for the CLI and return its path.
    pub fn config_file(&self) -> PathBuf {
        let config = Config {
            tools: self.tools_config(),
            ..Default::default()
        };
        let path = self.path("fileconv.json");
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
        path
    }

    /// Create a dummy input file.
    pub fn input(&self, name: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, b"not really media").unwrap();
        path
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Arguments the fake ffmpeg was last called with.
    pub fn recorded_args(&self) -> Vec<String> {
        std::fs::read_to_string(self.path("args.txt"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
