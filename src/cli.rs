use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fileconv")]
#[command(author, version, about = "FFmpeg-backed file conversion with progress reporting")]
pub struct Cli {
    /// Path to config file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a media file to another format
    Convert(ConvertArgs),

    /// Probe a media file's duration
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Check that ffmpeg and ffprobe are available
    CheckTools,

    /// List codecs supported by the installed ffmpeg
    Codecs {
        /// Only show codecs that can be encoded
        #[arg(long)]
        encoders_only: bool,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses --config if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

#[derive(clap::Args)]
pub struct ConvertArgs {
    /// Input media file
    #[arg(required = true)]
    pub input: PathBuf,

    /// Output file
    #[arg(required = true)]
    pub output: PathBuf,

    /// Target format (defaults to the output file's extension)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Video codec override (e.g. libx265)
    #[arg(long)]
    pub video_codec: Option<String>,

    /// Audio codec override (e.g. libopus)
    #[arg(long)]
    pub audio_codec: Option<String>,

    /// Video bitrate (e.g. 2500k)
    #[arg(long)]
    pub video_bitrate: Option<String>,

    /// Audio bitrate (e.g. 192k)
    #[arg(long)]
    pub audio_bitrate: Option<String>,

    /// Output frame rate
    #[arg(long)]
    pub fps: Option<u32>,

    /// Output size as WIDTHxHEIGHT; use ? to keep the aspect ratio (e.g. 640x?)
    #[arg(long)]
    pub size: Option<String>,

    /// Start offset in seconds
    #[arg(long)]
    pub start: Option<f64>,

    /// Maximum output duration in seconds
    #[arg(long)]
    pub duration: Option<f64>,

    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,
}
