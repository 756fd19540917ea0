//! Progress events emitted by a running conversion.
//!
//! A job produces a finite sequence of [`JobEvent::Progress`] values followed
//! by exactly one terminal event ([`JobEvent::Completed`] or
//! [`JobEvent::Failed`]).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Percent reported on the terminal success event and nowhere else.
pub const PERCENT_COMPLETE: u8 = 100;

/// Highest percent an in-flight tick may report.
pub const PERCENT_RUNNING_MAX: u8 = 99;

/// Message carried by the terminal success event.
pub const COMPLETED_MESSAGE: &str = "Conversion completed!";

// ---------------------------------------------------------------------------
// ProgressEvent
// ---------------------------------------------------------------------------

/// One progress update delivered to a job's sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// 0..=99 while running, 100 only on success.
    pub percent: u8,
    pub message: String,
}

impl ProgressEvent {
    pub fn new(percent: u8, message: impl Into<String>) -> Self {
        Self {
            percent,
            message: message.into(),
        }
    }

    /// The terminal success event.
    pub fn completed() -> Self {
        Self::new(PERCENT_COMPLETE, COMPLETED_MESSAGE)
    }

    pub fn is_complete(&self) -> bool {
        self.percent == PERCENT_COMPLETE
    }
}

// ---------------------------------------------------------------------------
// JobEvent
// ---------------------------------------------------------------------------

/// Stream item for a job observed through a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    Progress(ProgressEvent),
    Completed { output: PathBuf },
    Failed { error: String },
}

impl JobEvent {
    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobEvent::Progress(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_event() {
        let ev = ProgressEvent::completed();
        assert_eq!(ev.percent, 100);
        assert_eq!(ev.message, "Conversion completed!");
        assert!(ev.is_complete());
        assert!(!ProgressEvent::new(99, "Converting...").is_complete());
    }

    #[test]
    fn terminal_events() {
        assert!(!JobEvent::Progress(ProgressEvent::new(5, "x")).is_terminal());
        assert!(JobEvent::Completed {
            output: PathBuf::from("/tmp/out.mp4")
        }
        .is_terminal());
        assert!(JobEvent::Failed {
            error: "boom".into()
        }
        .is_terminal());
    }

    #[test]
    fn job_event_serializes_with_type_tag() {
        let ev = JobEvent::Failed {
            error: "boom".into(),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "failed");
        assert_eq!(json["error"], "boom");

        let ev = JobEvent::Progress(ProgressEvent::new(42, "Converting... 00:00:04.20"));
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["percent"], 42);
    }
}
