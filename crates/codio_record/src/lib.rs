//! codio Recorder
//!
//! Captures a live editing session from an [`EditorHost`] as an initial
//! frame plus a time-stamped event log, and saves it in the portable format.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod host;
pub mod recorder;
pub mod session;

pub use host::{
    Channel, EditorHost, EditorSnapshot, MemoryHost, Notification, RecordError, RecordResult,
};
pub use recorder::{Recorder, TimelineContent};
pub use session::{RecorderConfig, RecordingSession, RecordingState, load_metadata, load_timeline};
