//! Player: seeks into and plays back a loaded recording.
//!
//! Seeking never replays through the surface step by step. The target frame
//! is folded from a copy of the initial frame and shown in one pass. Live
//! playback is a single chained task held by a [`TimerSlot`], so there is at
//! most one pending step at any time.

use crate::engine::{FoldStats, FrameBuilder};
use crate::frame::Frame;
use crate::scheduler::TimerSlot;
use crate::snapshot::deserialize_frame;
use crate::surface::{DocumentSurface, SurfaceError, apply_event, apply_frame, close_absent};
use codio_core::{Clock, DocumentId, EpochMs, RelativeMs};
use codio_log::{
    Event, LogError, PersistedTimeline, Timeline, create_timeline_with_absolute_times, decode_events,
    is_ordered,
};
use indexmap::IndexSet;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Player error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayerError {
    /// Nothing has been loaded yet
    #[error("no recording loaded")]
    NotLoaded,

    /// The player was destroyed
    #[error("player destroyed")]
    Destroyed,

    /// The playback session was stopped
    #[error("playback session closed")]
    SessionClosed,

    /// The persisted timeline could not be decoded
    #[error("cannot decode recording: {0}")]
    Decode(#[from] LogError),
}

/// Player result type
pub type PlayerResult<T> = Result<T, PlayerError>;

/// Player lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerState {
    /// Nothing loaded
    Idle,
    /// Recording loaded, not playing
    Loaded,
    /// Playback task scheduled
    Playing,
    /// Playback stopped mid-recording
    Paused,
    /// Terminal; every operation is a no-op
    Destroyed,
}

/// Player configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Drop the surface selection when playback pauses
    pub clear_selection_on_pause: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            clear_selection_on_pause: true,
        }
    }
}

/// Result of a seek
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeekOutcome {
    /// Offset actually shown, after clamping
    pub at: RelativeMs,
    /// Frame shown
    pub frame: Frame,
    /// Surface calls that failed; the rest of the frame was still shown
    pub failures: Vec<SurfaceError>,
    /// Fold counters
    pub stats: FoldStats,
}

/// Seeks and plays a recording onto a shared surface
pub struct Player<S: DocumentSurface + 'static> {
    config: PlayerConfig,
    state: PlayerState,
    initial_frame: Frame,
    timeline: Timeline,
    documents: IndexSet<DocumentId>,
    surface: Arc<Mutex<S>>,
    clock: Arc<dyn Clock>,
    timer: TimerSlot,
}

impl<S: DocumentSurface + 'static> Player<S> {
    /// Create an idle player writing to `surface`
    #[must_use]
    pub fn new(surface: Arc<Mutex<S>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config: PlayerConfig::default(),
            state: PlayerState::Idle,
            initial_frame: Frame::new(),
            timeline: Timeline::default(),
            documents: IndexSet::new(),
            surface,
            clock,
            timer: TimerSlot::new(),
        }
    }

    /// Create with custom config
    #[must_use]
    pub fn with_config(mut self, config: PlayerConfig) -> Self {
        self.config = config;
        self
    }

    /// Load a persisted timeline, resolving document paths against `root`.
    ///
    /// Returns `true` when there is anything to replay. A timeline that
    /// fails to decode is logged and leaves the player unchanged.
    pub fn load(&mut self, root: Option<&Path>, timeline: &PersistedTimeline) -> bool {
        if self.state == PlayerState::Destroyed {
            return false;
        }
        match self.try_load(root, timeline) {
            Ok(loaded) => loaded,
            Err(err) => {
                warn!(error = %err, "failed to load recording");
                false
            }
        }
    }

    /// Parse and load a timeline from JSON
    pub fn load_json(&mut self, root: Option<&Path>, json: &str) -> bool {
        match PersistedTimeline::from_json(json) {
            Ok(timeline) => self.load(root, &timeline),
            Err(err) => {
                warn!(error = %err, "failed to parse recording");
                false
            }
        }
    }

    fn try_load(&mut self, root: Option<&Path>, persisted: &PersistedTimeline) -> PlayerResult<bool> {
        let mut events = decode_events(&persisted.events, root)?;
        if !is_ordered(&events) {
            warn!("recording events out of order, sorting by time");
            events.sort_by_key(|e| e.time);
        }
        let initial_frame = deserialize_frame(&persisted.initial_frame, root);
        let loaded = !events.is_empty() || !initial_frame.is_empty();

        self.timer.cancel();
        self.documents = initial_frame
            .documents()
            .chain(events.iter().map(|e| &e.document))
            .cloned()
            .collect();
        self.initial_frame = initial_frame;
        self.timeline = Timeline::new(events, persisted.codio_length);
        self.state = if loaded { PlayerState::Loaded } else { PlayerState::Idle };

        info!(
            events = self.timeline.len(),
            documents = self.initial_frame.len(),
            length = %self.timeline.duration,
            "recording loaded"
        );
        Ok(loaded)
    }

    /// Frame at `t` (clamped) without touching the surface
    #[must_use]
    pub fn frame_at(&self, t: RelativeMs) -> (Frame, FoldStats) {
        let t = self.timeline.clamp(t);
        if t == RelativeMs::zero() {
            return (self.initial_frame.clone(), FoldStats::default());
        }
        let mut builder = FrameBuilder::new(&self.initial_frame);
        builder.apply_all(&self.timeline.until(t));
        builder.finish()
    }

    /// Show the frame at `t`, clamped to `[0, length]`.
    ///
    /// Cancels pending playback. Documents of the recording that the frame
    /// does not hold are closed, so showing an offset yields the same surface
    /// state whatever was shown before.
    pub fn move_to_frame(&mut self, t: RelativeMs) -> SeekOutcome {
        if self.state == PlayerState::Destroyed {
            return SeekOutcome::default();
        }
        self.stop_timer();

        let at = self.timeline.clamp(t);
        let (frame, stats) = self.frame_at(at);
        let failures = {
            let mut surface = self.surface.lock();
            let mut failures = close_absent(&mut *surface, &self.documents, &frame);
            failures.extend(apply_frame(&mut *surface, &frame));
            failures
        };
        debug!(at = %at, documents = frame.len(), failures = failures.len(), "moved to frame");

        SeekOutcome {
            at,
            frame,
            failures,
            stats,
        }
    }

    /// Seek by a signed offset; negative offsets show the initial frame
    pub fn move_to_offset(&mut self, millis: i64) -> SeekOutcome {
        let t = u64::try_from(millis).map_or(RelativeMs::zero(), RelativeMs);
        self.move_to_frame(t)
    }

    /// Play `events` (relative to `start`) onto the surface in real time.
    ///
    /// Replaces any pending playback.
    pub fn play(&mut self, events: &[Event], start: EpochMs) {
        if self.state == PlayerState::Destroyed {
            return;
        }
        let schedule = create_timeline_with_absolute_times(events, start);
        let surface = Arc::clone(&self.surface);
        let clock = Arc::clone(&self.clock);

        self.timer.schedule(async move {
            for event in schedule {
                let wait = event.time.since(clock.now());
                if wait > RelativeMs::zero() {
                    tokio::time::sleep(wait.as_duration()).await;
                }
                let result = {
                    let mut surface = surface.lock();
                    apply_event(&mut *surface, &event)
                };
                if let Err(err) = result {
                    warn!(document = %event.document, kind = %event.kind(), error = %err, "failed to replay event");
                }
            }
            debug!("playback reached end of timeline");
        });
        self.state = PlayerState::Playing;
    }

    /// Stop playback
    pub fn pause(&mut self) {
        if self.state == PlayerState::Destroyed {
            return;
        }
        self.stop_timer();
        if self.config.clear_selection_on_pause {
            if let Err(err) = self.surface.lock().clear_selection() {
                warn!(error = %err, "failed to clear selection");
            }
        }
    }

    /// Events from `t`, re-based so `t` is the origin
    #[must_use]
    pub fn get_timeline(&self, t: RelativeMs) -> Vec<Event> {
        if self.state == PlayerState::Destroyed {
            return Vec::new();
        }
        self.timeline.remaining_from(t)
    }

    /// Cancel playback and disable the player
    pub fn destroy(&mut self) {
        self.timer.cancel();
        self.state = PlayerState::Destroyed;
    }

    /// Lifecycle state
    #[must_use]
    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Whether a playback task is still running
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.state == PlayerState::Playing && self.timer.is_pending()
    }

    /// Recording length
    #[must_use]
    pub fn duration(&self) -> RelativeMs {
        self.timeline.duration
    }

    /// Frame at offset zero
    #[must_use]
    pub fn initial_frame(&self) -> &Frame {
        &self.initial_frame
    }

    /// Loaded events
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.timeline.events
    }

    /// Shared surface
    #[must_use]
    pub fn surface(&self) -> &Arc<Mutex<S>> {
        &self.surface
    }

    /// Current absolute time
    #[must_use]
    pub fn now(&self) -> EpochMs {
        self.clock.now()
    }

    fn stop_timer(&mut self) {
        self.timer.cancel();
        if self.state == PlayerState::Playing {
            self.state = PlayerState::Paused;
        }
    }
}

impl<S: DocumentSurface + 'static> std::fmt::Debug for Player<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("documents", &self.initial_frame.len())
            .field("events", &self.timeline.len())
            .field("duration", &self.timeline.duration)
            .finish_non_exhaustive()
    }
}
