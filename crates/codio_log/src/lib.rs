//! codio Event Log
//!
//! Editor mutation events, pure timeline slicing, and the portable on-disk
//! encoding of recorded timelines.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cursor;
pub mod event;
pub mod persisted;
pub mod timeline;

pub use cursor::Cursor;
pub use event::{ContentChange, DocumentSwitch, Event, EventKind, EventPayload};
pub use persisted::{
    LogError, LogResult, METADATA_FILE, Metadata, PersistedEvent, PersistedFile,
    PersistedTimeline, TIMELINE_FILE, decode_events, encode_events,
};
pub use timeline::{
    Timeline, create_relative_timeline, create_timeline_with_absolute_times, cut_timeline_from,
    cut_timeline_until, is_ordered, timeline_duration,
};
