//! codio Replay Engine
//!
//! Frame reconstruction at arbitrary offsets, the surface contract replays
//! write through, and timed playback with a single outstanding step.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod frame;
pub mod player;
pub mod progress;
pub mod scheduler;
pub mod session;
pub mod snapshot;
pub mod surface;

pub use engine::{FoldStats, FrameBuilder, create_frame};
pub use frame::{Frame, FrameDiff, FrameEntry};
pub use player::{Player, PlayerConfig, PlayerError, PlayerResult, PlayerState, SeekOutcome};
pub use progress::ProgressTimer;
pub use scheduler::TimerSlot;
pub use session::PlaybackSession;
pub use snapshot::{deserialize_frame, serialize_frame};
pub use surface::{
    DocumentSurface, MemorySurface, OpenDocument, SurfaceError, SurfaceResult, apply_event,
    apply_frame, close_absent,
};
