//! Pure timeline slicing and rebasing.
//!
//! None of these functions reorder events; the same input always yields the
//! same output.

use crate::event::Event;
use codio_core::{EpochMs, RelativeMs, Timepoint};

/// Prefix of `events` with `time <= t`.
///
/// Used to rebuild the frame at `t` from the initial frame.
#[must_use]
pub fn cut_timeline_until<T: Timepoint>(events: &[Event<T>], t: T) -> Vec<Event<T>> {
    events.iter().filter(|e| e.time <= t).cloned().collect()
}

/// Suffix of `events` with `time >= t`.
///
/// Used to resume playback mid-stream.
#[must_use]
pub fn cut_timeline_from<T: Timepoint>(events: &[Event<T>], t: T) -> Vec<Event<T>> {
    events.iter().filter(|e| e.time >= t).cloned().collect()
}

/// Copy of `events` re-based onto `origin`; offsets before the origin clamp to zero.
///
/// Works on capture-time events ([`EpochMs`]) as well as on relative slices.
#[must_use]
pub fn create_relative_timeline<T: Timepoint>(events: &[Event<T>], origin: T) -> Vec<Event<RelativeMs>> {
    let origin = origin.as_millis();
    events
        .iter()
        .map(|e| {
            let offset = RelativeMs(e.time.as_millis().saturating_sub(origin));
            e.clone().with_time(offset)
        })
        .collect()
}

/// Absolute schedule times for a relative slice starting at `start`
#[must_use]
pub fn create_timeline_with_absolute_times(events: &[Event], start: EpochMs) -> Vec<Event<EpochMs>> {
    events
        .iter()
        .map(|e| e.clone().with_time(start.offset_by(e.time)))
        .collect()
}

/// Offset of the last event, or zero for an empty log
#[must_use]
pub fn timeline_duration(events: &[Event]) -> RelativeMs {
    events.last().map_or(RelativeMs::zero(), |e| e.time)
}

/// Whether times never decrease along the log
#[must_use]
pub fn is_ordered<T: Timepoint>(events: &[Event<T>]) -> bool {
    events.windows(2).all(|pair| pair[0].time <= pair[1].time)
}

/// Ordered event log with its total duration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    /// Events in non-decreasing time order
    pub events: Vec<Event>,
    /// Total length of the recording
    pub duration: RelativeMs,
}

impl Timeline {
    /// Create a timeline
    #[must_use]
    pub fn new(events: Vec<Event>, duration: RelativeMs) -> Self {
        Self { events, duration }
    }

    /// Clamp an offset into `[0, duration]`
    #[must_use]
    pub fn clamp(&self, t: RelativeMs) -> RelativeMs {
        t.clamp_to(self.duration)
    }

    /// Events up to and including `t`
    #[must_use]
    pub fn until(&self, t: RelativeMs) -> Vec<Event> {
        cut_timeline_until(&self.events, t)
    }

    /// Events from `t`, re-based so `t` becomes the origin
    #[must_use]
    pub fn remaining_from(&self, t: RelativeMs) -> Vec<Event> {
        create_relative_timeline(&cut_timeline_from(&self.events, t), t)
    }

    /// Number of events
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the log is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
