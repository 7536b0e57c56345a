//! Fold engine: rebuilds a frame from an initial frame and an event slice.

use crate::frame::{Frame, FrameEntry};
use codio_core::Timepoint;
use codio_log::{Event, EventPayload};
use tracing::{debug, warn};

/// Counters collected while folding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FoldStats {
    /// Events that changed the frame
    pub applied: usize,
    /// Events naming a document the frame does not know
    pub skipped_unknown: usize,
    /// Text edits whose position could not be translated
    pub failed_edits: usize,
}

impl FoldStats {
    /// Total events seen
    #[must_use]
    pub fn total(&self) -> usize {
        self.applied + self.skipped_unknown
    }
}

/// Folds events onto a private copy of a frame.
///
/// The logical clock continues from the highest `last_action_index` of the
/// starting frame and moves by one per applied event, so folding a log in
/// one pass or in consecutive slices yields the same frame.
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    frame: Frame,
    clock: u64,
    stats: FoldStats,
}

impl FrameBuilder {
    /// Start from a copy of `initial`
    #[must_use]
    pub fn new(initial: &Frame) -> Self {
        Self {
            clock: initial.clock(),
            frame: initial.clone(),
            stats: FoldStats::default(),
        }
    }

    /// Apply one event
    pub fn apply<T: Timepoint>(&mut self, event: &Event<T>) {
        let id = &event.document;

        if let EventPayload::DocumentSwitch(switch) = &event.payload {
            if switch.is_initial && !self.frame.contains(id) {
                let index = self.tick();
                let entry = FrameEntry::new(switch.content.clone(), switch.view_column, index)
                    .with_selections(switch.selections.clone())
                    .with_visible_range(switch.visible_range);
                self.frame.insert(id.clone(), entry);
                return;
            }
        }

        if !self.frame.contains(id) {
            debug!(document = %id, kind = %event.kind(), "event for unknown document");
            self.stats.skipped_unknown += 1;
            return;
        }

        let index = self.tick();
        let Some(entry) = self.frame.get_mut(id) else {
            return;
        };
        entry.last_action_index = index;

        match &event.payload {
            EventPayload::TextChange { changes } => {
                for change in changes {
                    if !entry.document.replace_with_range(change.range, &change.text) {
                        self.stats.failed_edits += 1;
                    }
                }
            }
            EventPayload::SelectionChange { selections } => {
                entry.selections.clone_from(selections);
            }
            EventPayload::VisibleRangeChange { visible_range } => {
                entry.visible_range = Some(*visible_range);
            }
            EventPayload::DocumentSwitch(switch) => {
                entry.view_column = switch.view_column;
                entry.selections.clone_from(&switch.selections);
                if switch.visible_range.is_some() {
                    entry.visible_range = switch.visible_range;
                }
            }
        }
    }

    /// Apply events in order
    pub fn apply_all<'a, T: Timepoint + 'a>(&mut self, events: impl IntoIterator<Item = &'a Event<T>>) {
        for event in events {
            self.apply(event);
        }
    }

    /// Current logical clock
    #[must_use]
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Counters so far
    #[must_use]
    pub fn stats(&self) -> FoldStats {
        self.stats
    }

    /// Frame built so far
    #[must_use]
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Finish and take the frame
    #[must_use]
    pub fn finish(self) -> (Frame, FoldStats) {
        if self.stats.failed_edits > 0 {
            warn!(failed = self.stats.failed_edits, "some text edits could not be applied");
        }
        (self.frame, self.stats)
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.stats.applied += 1;
        self.clock
    }
}

/// Fold `events` onto a copy of `initial`
#[must_use]
pub fn create_frame<T: Timepoint>(initial: &Frame, events: &[Event<T>]) -> Frame {
    let mut builder = FrameBuilder::new(initial);
    builder.apply_all(events);
    builder.finish().0
}
