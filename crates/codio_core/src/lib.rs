//! codio Core Types
//!
//! This crate contains pure types and logic with no I/O.
//! Positions, document identifiers, relative and absolute time, and the
//! shadow text buffer every replay mutates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod error;
pub mod position;
pub mod shadow;
pub mod time;
pub mod version;

// Re-exports
pub use document::DocumentId;
pub use error::CoreError;
pub use position::{Position, Range, Selection};
pub use shadow::{ShadowDocument, ShadowError};
pub use time::{Clock, EpochMs, ManualClock, RelativeMs, SystemClock, Timepoint};
pub use version::{FORMAT_VERSION, Version, VersionError};
