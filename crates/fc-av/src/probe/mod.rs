//! Probe backends that shell out to external tools.
//!
//! Only the input duration is needed: it turns ffmpeg's elapsed timemark into
//! a percentage.

pub mod ffprobe;

pub use self::ffprobe::{parse_duration, FfprobeProber};
