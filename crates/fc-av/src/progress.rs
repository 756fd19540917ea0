//! FFmpeg progress parsing and percent normalization.
//!
//! ffmpeg is run with `-progress pipe:2 -nostats`, so stderr interleaves
//! the input banner (which carries `Duration: HH:MM:SS.ms`), `key=value`
//! progress fields closed by a `progress=continue|end` line, and ordinary
//! log output. [`ProgressParser`] turns that stream into [`ProgressTick`]s and
//! [`ProgressTracker`] maps ticks onto the 0..=99 running scale.

use fc_core::events::{ProgressEvent, PERCENT_RUNNING_MAX};

/// Parse an `HH:MM:SS.ms` timemark into seconds.
///
/// Anything that is not exactly three colon-separated components yields `0`,
/// as does any component that is not a number.
pub fn parse_timemark(timemark: &str) -> f64 {
    let parts: Vec<&str> = timemark.trim().split(':').collect();
    if parts.len() != 3 {
        return 0.0;
    }

    let component = |s: &str| s.trim().parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0);
    component(parts[0]) * 3600.0 + component(parts[1]) * 60.0 + component(parts[2])
}

/// Round and clamp a raw percentage onto the running scale.
pub fn clamp_percent(value: f64) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    value.round().clamp(0.0, f64::from(PERCENT_RUNNING_MAX)) as u8
}

/// Seconds of output a run over `total` seconds of input produces once
/// `start` is skipped and the result is capped at `limit`. `None` when
/// nothing is left.
pub fn trimmed_length(total: f64, start: Option<f64>, limit: Option<f64>) -> Option<f64> {
    let remaining = total - start.unwrap_or(0.0);
    let expected = match limit {
        Some(limit) => remaining.min(limit),
        None => remaining,
    };
    (expected.is_finite() && expected > 0.0).then_some(expected)
}

// ---------------------------------------------------------------------------
// ProgressTick
// ---------------------------------------------------------------------------

/// One progress report from the transcoder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressTick {
    /// Elapsed output position as `HH:MM:SS.micro`, when ffmpeg knows it.
    pub timemark: Option<String>,
    /// The tool's own estimate, derived from the duration in its banner.
    pub percent: Option<f64>,
    /// Frames written so far.
    pub frame: Option<u64>,
    /// Encoding speed relative to realtime.
    pub speed: Option<f64>,
    /// `progress=end`: ffmpeg finished writing. Not a success signal; only
    /// the exit status is.
    pub finished: bool,
}

/// Classification of one stderr line.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    /// A progress block closed; here is the tick.
    Tick(ProgressTick),
    /// A progress field or banner line that was absorbed into parser state.
    Field,
    /// Anything else (log output, error text).
    Other,
}

// ---------------------------------------------------------------------------
// ProgressParser
// ---------------------------------------------------------------------------

/// Stateful parser for ffmpeg's stderr.
#[derive(Debug, Clone, Default)]
pub struct ProgressParser {
    input_duration: Option<f64>,
    start_offset: Option<f64>,
    length_limit: Option<f64>,
    out_time: Option<String>,
    frame: Option<u64>,
    speed: Option<f64>,
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scale the banner-based estimate to a run that skips `start` seconds
    /// of input and stops after `limit` seconds of output.
    pub fn with_trim(mut self, start: Option<f64>, limit: Option<f64>) -> Self {
        self.start_offset = start;
        self.length_limit = limit;
        self
    }

    /// Input duration announced in ffmpeg's banner, if seen.
    pub fn input_duration(&self) -> Option<f64> {
        self.input_duration
    }

    /// Feed one stderr line.
    pub fn feed(&mut self, line: &str) -> ParsedLine {
        let line = line.trim();

        if let Some(rest) = line.strip_prefix("Duration:") {
            // Only the first input's banner matters.
            if self.input_duration.is_none() {
                let value = rest.split(',').next().unwrap_or_default();
                let secs = parse_timemark(value);
                if secs > 0.0 {
                    self.input_duration = Some(secs);
                }
            }
            return ParsedLine::Field;
        }

        let Some((key, value)) = line.split_once('=') else {
            return ParsedLine::Other;
        };
        let value = value.trim();

        match key {
            "out_time" => {
                self.out_time = (value != "N/A" && !value.starts_with('-')).then(|| value.to_string());
            }
            "frame" => self.frame = value.parse().ok(),
            "speed" => {
                self.speed = value
                    .strip_suffix('x')
                    .and_then(|s| s.trim().parse().ok());
            }
            "progress" => return ParsedLine::Tick(self.tick(value == "end")),
            k if is_progress_key(k) => {}
            _ => return ParsedLine::Other,
        }

        ParsedLine::Field
    }

    fn tick(&self, finished: bool) -> ProgressTick {
        let expected = self
            .input_duration
            .and_then(|total| trimmed_length(total, self.start_offset, self.length_limit));
        let percent = match (expected, self.out_time.as_deref()) {
            (Some(total), Some(tm)) => Some(parse_timemark(tm) / total * 100.0),
            _ => None,
        };

        ProgressTick {
            timemark: self.out_time.clone(),
            percent,
            frame: self.frame,
            speed: self.speed,
            finished,
        }
    }
}

/// Keys ffmpeg writes in a `-progress` block that carry nothing we use.
fn is_progress_key(key: &str) -> bool {
    matches!(
        key,
        "fps"
            | "bitrate"
            | "total_size"
            | "out_time_us"
            | "out_time_ms"
            | "dup_frames"
            | "drop_frames"
    ) || key.starts_with("stream_")
}

// ---------------------------------------------------------------------------
// ProgressTracker
// ---------------------------------------------------------------------------

/// Maps ticks onto the caller-facing percent scale.
///
/// Percent is computed from the probed duration when one is known, otherwise
/// from the tool's own estimate, otherwise it holds at the last value. It
/// never decreases and never exceeds 99; only the job's terminal success
/// event reports 100.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    duration_secs: Option<f64>,
    last_percent: u8,
}

impl ProgressTracker {
    pub fn new(duration_secs: Option<f64>) -> Self {
        Self {
            duration_secs: duration_secs.filter(|d| d.is_finite() && *d > 0.0),
            last_percent: 0,
        }
    }

    /// Last percent handed out.
    pub fn percent(&self) -> u8 {
        self.last_percent
    }

    /// Fold a tick into the tracker and build the event for the sink.
    pub fn update(&mut self, tick: &ProgressTick) -> ProgressEvent {
        let candidate = match (self.duration_secs, tick.timemark.as_deref()) {
            (Some(total), Some(tm)) => Some(clamp_percent(parse_timemark(tm) / total * 100.0)),
            _ => tick.percent.map(clamp_percent),
        };

        if let Some(p) = candidate {
            self.last_percent = self.last_percent.max(p);
        }

        let message = match tick.timemark.as_deref() {
            Some(tm) => format!("Converting... {tm}"),
            None => "Converting...".to_string(),
        };

        ProgressEvent::new(self.last_percent, message)
    }
}
