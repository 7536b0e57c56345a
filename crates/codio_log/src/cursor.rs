//! Cursor for navigating a timeline by offset.

use codio_core::RelativeMs;

/// Playback position bounded by the timeline length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    position: RelativeMs,
    length: RelativeMs,
}

impl Cursor {
    /// Cursor at the origin of a timeline of `length`
    #[must_use]
    pub fn new(length: RelativeMs) -> Self {
        Self {
            position: RelativeMs::zero(),
            length,
        }
    }

    /// Move forward, stopping at the end
    pub fn move_forward(&mut self, by: RelativeMs) {
        self.position = self.position.saturating_add(by).clamp_to(self.length);
    }

    /// Move backward, stopping at the origin
    pub fn move_backward(&mut self, by: RelativeMs) {
        self.position = self.position.saturating_sub(by);
    }

    /// Jump to an offset, clamped to the length
    pub fn seek(&mut self, position: RelativeMs) {
        self.position = position.clamp_to(self.length);
    }

    /// Current offset
    #[must_use]
    pub const fn pos(&self) -> RelativeMs {
        self.position
    }

    /// Back to the origin
    pub fn reset(&mut self) {
        self.position = RelativeMs::zero();
    }
}
