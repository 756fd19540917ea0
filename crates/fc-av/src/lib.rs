//! # fc-av
//!
//! ffmpeg-backed media conversion for fileconv.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find ffmpeg and ffprobe, honoring
//!   configured overrides.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout
//!   support and line-by-line stderr observation.
//! - **Duration probing** ([`FfprobeProber`]).
//! - **Option mapping** ([`ConversionOptions`], [`Invocation`]) -- output
//!   format and caller overrides to an ffmpeg argument list.
//! - **Progress** ([`ProgressParser`], [`ProgressTracker`]) -- ffmpeg
//!   `-progress` output to normalized percent events.
//! - **Jobs** ([`TranscodeJob`]) -- one conversion end to end, awaited
//!   directly or spawned and observed as a stream of [`fc_core::JobEvent`]s.
//! - **Capabilities** ([`supported_codecs`], [`ToolRegistry::ffmpeg_version`]).

pub mod codecs;
pub mod command;
pub mod job;
pub mod options;
pub mod probe;
pub mod progress;
pub mod tools;

pub use codecs::{supported_codecs, CodecInfo, CodecKind};
pub use command::{ToolCommand, ToolOutput};
pub use job::{TranscodeHandle, TranscodeJob};
pub use options::{CodecOptions, ConversionOptions, Invocation, QualityOptions};
pub use probe::FfprobeProber;
pub use progress::{parse_timemark, ProgressParser, ProgressTracker};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
