//! fc-core: shared errors, configuration, media-format classification and
//! progress events.
//!
//! This crate is the foundational dependency for the other fc-* crates.

pub mod config;
pub mod error;
pub mod events;
pub mod media;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use events::{JobEvent, ProgressEvent};
pub use media::FormatFamily;
