//! Conversion options and their mapping onto ffmpeg arguments.
//!
//! [`ConversionOptions`] is what a caller asks for. [`Invocation::build`]
//! classifies the output format into a [`FormatFamily`], fills in the family
//! defaults for anything the caller left out, and renders the ffmpeg
//! argument list.

use std::path::Path;

use fc_core::config::TranscodeConfig;
use fc_core::media::normalize_format;
use fc_core::{Error, FormatFamily};
use serde::{Deserialize, Serialize};

/// Quality overrides. Bitrates use ffmpeg notation (`"1000k"`, `"5M"`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityOptions {
    pub video: Option<String>,
    pub audio: Option<String>,
    pub fps: Option<u32>,
    /// `WxH`, `Wx?` or `?xH`; `?` keeps the aspect ratio.
    pub size: Option<String>,
}

/// Codec overrides, by ffmpeg encoder name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecOptions {
    pub video: Option<String>,
    pub audio: Option<String>,
}

/// What the caller wants out of one conversion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    #[serde(alias = "outputFormat")]
    pub output_format: String,
    pub quality: QualityOptions,
    pub codec: CodecOptions,
    /// Seconds to skip at the start of the input.
    #[serde(alias = "startTime")]
    pub start_time: Option<f64>,
    /// Seconds of output to produce.
    pub duration: Option<f64>,
}

impl ConversionOptions {
    /// Options for `format` with every default left in place.
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            output_format: format.into(),
            ..Default::default()
        }
    }

    /// Options for whatever format the output path's extension names.
    pub fn for_output(path: &Path) -> Self {
        Self::new(
            path.extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_default(),
        )
    }

    pub fn with_video_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec.video = Some(codec.into());
        self
    }

    pub fn with_audio_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec.audio = Some(codec.into());
        self
    }

    pub fn with_trim(mut self, start_time: Option<f64>, duration: Option<f64>) -> Self {
        self.start_time = start_time;
        self.duration = duration;
        self
    }

    /// Start offset if one was asked for.
    pub fn start_offset(&self) -> Option<f64> {
        self.start_time.filter(|s| s.is_finite() && *s > 0.0)
    }

    /// Output length limit if one was asked for.
    pub fn length_limit(&self) -> Option<f64> {
        self.duration.filter(|d| d.is_finite() && *d > 0.0)
    }
}

/// Default video encoder for an output format.
pub fn default_video_codec(format: &str) -> &'static str {
    match format {
        "webm" => "libvpx-vp9",
        "gif" => "gif",
        _ => "libx264",
    }
}

/// Default audio encoder for an output format.
pub fn default_audio_codec(format: &str) -> &'static str {
    match format {
        "webm" => "libopus",
        "mp3" => "libmp3lame",
        "ogg" => "libvorbis",
        "wav" => "pcm_s16le",
        "flac" => "flac",
        _ => "aac",
    }
}

/// A fully resolved ffmpeg invocation for one job.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub format: String,
    pub family: FormatFamily,
    /// `None` means the video stream is dropped.
    pub video_codec: Option<String>,
    /// `None` means the audio stream is dropped.
    pub audio_codec: Option<String>,
    pub video_bitrate: Option<String>,
    pub audio_bitrate: Option<String>,
    pub preset: Option<String>,
    pub fps: Option<u32>,
    /// Scale filter, e.g. `scale=480:-1`.
    pub scale: Option<String>,
    pub start_time: Option<f64>,
    pub duration: Option<f64>,
}

impl Invocation {
    /// Resolve `options` against the family defaults in `defaults`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidOptions`] for a malformed `quality.size`, or for an
    /// unknown output format when `defaults.strict_formats` is set.
    pub fn build(options: &ConversionOptions, defaults: &TranscodeConfig) -> fc_core::Result<Self> {
        let format = normalize_format(&options.output_format);
        let family = FormatFamily::of(&format);

        if family == FormatFamily::Unknown {
            if defaults.strict_formats {
                return Err(Error::InvalidOptions(format!(
                    "unsupported output format '{}'",
                    options.output_format
                )));
            }
            tracing::warn!(
                "Unrecognized output format '{}'; using generic video defaults",
                options.output_format
            );
        }

        let q = &options.quality;
        let c = &options.codec;
        // A zero frame rate means "not set".
        let fps = q.fps.filter(|f| *f > 0);
        let pick = |over: &Option<String>, default: &str| {
            over.clone()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let mut inv = Self {
            format: format.clone(),
            family,
            video_codec: None,
            audio_codec: None,
            video_bitrate: None,
            audio_bitrate: None,
            preset: None,
            fps,
            scale: None,
            start_time: options.start_offset(),
            duration: options.length_limit(),
        };

        match family {
            FormatFamily::Video | FormatFamily::Unknown => {
                inv.video_codec = Some(pick(&c.video, default_video_codec(&format)));
                inv.audio_codec = Some(pick(&c.audio, default_audio_codec(&format)));
                inv.video_bitrate = Some(pick(&q.video, defaults.video_bitrate.as_str()));
                inv.audio_bitrate = Some(pick(&q.audio, defaults.audio_bitrate.as_str()));
                inv.preset = Some(defaults.preset.clone());
                inv.scale = q.size.as_deref().map(|s| scale_filter(s, -2)).transpose()?;
            }
            FormatFamily::Audio => {
                inv.audio_codec = Some(pick(&c.audio, default_audio_codec(&format)));
                inv.audio_bitrate = Some(pick(&q.audio, defaults.audio_only_bitrate.as_str()));
                inv.fps = None;
            }
            FormatFamily::Gif => {
                inv.video_codec = Some(pick(&c.video, default_video_codec(&format)));
                inv.fps = Some(fps.unwrap_or(defaults.gif_fps));
                let size = q
                    .size
                    .clone()
                    .unwrap_or_else(|| format!("{}x?", defaults.gif_width));
                inv.scale = Some(scale_filter(&size, -1)?);
            }
        }

        Ok(inv)
    }

    /// Full ffmpeg argument list, progress reporting included.
    pub fn to_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-nostats", "-progress", "pipe:2", "-y", "-i"]
            .into_iter()
            .map(String::from)
            .collect();
        args.push(input.to_string_lossy().to_string());

        match &self.video_codec {
            Some(codec) => args.extend(["-c:v".into(), codec.clone()]),
            None => args.push("-vn".into()),
        }
        match &self.audio_codec {
            Some(codec) => args.extend(["-c:a".into(), codec.clone()]),
            None => args.push("-an".into()),
        }
        if let Some(b) = &self.video_bitrate {
            args.extend(["-b:v".into(), b.clone()]);
        }
        if let Some(b) = &self.audio_bitrate {
            args.extend(["-b:a".into(), b.clone()]);
        }
        if let Some(p) = &self.preset {
            args.extend(["-preset".into(), p.clone()]);
        }
        if let Some(fps) = self.fps {
            args.extend(["-r".into(), fps.to_string()]);
        }
        if let Some(scale) = &self.scale {
            args.extend(["-vf".into(), scale.clone()]);
        }
        if let Some(ss) = self.start_time {
            args.extend(["-ss".into(), format!("{ss:.3}")]);
        }
        if let Some(t) = self.duration {
            args.extend(["-t".into(), format!("{t:.3}")]);
        }

        args.push(output.to_string_lossy().to_string());
        args
    }
}

/// Turn a `WxH` / `Wx?` / `?xH` size into a scale filter. `auto` is the
/// value ffmpeg should use for the `?` side (-1 keeps the ratio, -2 also
/// rounds to an even number).
fn scale_filter(size: &str, auto: i32) -> fc_core::Result<String> {
    let invalid = || Error::InvalidOptions(format!("invalid size '{size}', expected WxH, Wx? or ?xH"));

    let (w, h) = size.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
    let dim = |s: &str| -> fc_core::Result<Option<u32>> {
        match s.trim() {
            "?" => Ok(None),
            n => n.parse::<u32>().ok().filter(|v| *v > 0).map(Some).ok_or_else(invalid),
        }
    };

    let render = |d: Option<u32>| d.map_or(auto.to_string(), |v| v.to_string());
    match (dim(w)?, dim(h)?) {
        (None, None) => Err(invalid()),
        (w, h) => Ok(format!("scale={}:{}", render(w), render(h))),
    }
}
