//! Unified error type for the fileconv crates.
//!
//! All crates funnel their failures into [`Error`], which carries enough context
//! for a surrounding service to derive an HTTP status code via
//! [`Error::http_status`].

/// Unified error type covering all failure modes in fileconv.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// An external tool (ffmpeg, ffprobe) could not be run or returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Media probing failed.
    #[error("Probe error: {0}")]
    Probe(String),

    /// The transcoder reported a failure. Fatal to the job.
    #[error("FFmpeg conversion failed: {message}")]
    Transcode {
        /// Message reported by the transcoder.
        message: String,
    },

    /// Caller-supplied conversion options are malformed.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// Configuration could not be parsed.
    #[error("Config error: {0}")]
    Config(String),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::Io { .. } => 500,
            Error::Tool { .. } => 502,
            Error::Probe(_) => 422,
            Error::Transcode { .. } => 422,
            Error::InvalidOptions(_) => 400,
            Error::Config(_) => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Transcode`].
    pub fn transcode(message: impl Into<String>) -> Self {
        Error::Transcode {
            message: message.into(),
        }
    }

    /// Whether this error ends a job. Probe errors only degrade progress
    /// reporting.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Probe(_))
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
