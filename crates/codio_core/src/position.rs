//! Positions, ranges and selections inside a text document.
//!
//! Lines and characters are zero-based. A character counts Unicode scalar
//! values within its line.

use serde::{Deserialize, Serialize};

/// A line/character location
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// Zero-based line
    pub line: u32,
    /// Zero-based character within the line
    pub character: u32,
}

impl Position {
    /// Create a new position
    #[must_use]
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.character)
    }
}

/// A span between two positions.
///
/// Persisted as a two-element array `[start, end]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[Position; 2]", into = "[Position; 2]")]
pub struct Range {
    /// Start position
    pub start: Position,
    /// End position
    pub end: Position,
}

impl Range {
    /// Create a range; the endpoints are ordered so `start <= end`
    #[must_use]
    pub fn new(a: Position, b: Position) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    /// Range from raw coordinates
    #[must_use]
    pub fn from_coords(start_line: u32, start_char: u32, end_line: u32, end_char: u32) -> Self {
        Self::new(
            Position::new(start_line, start_char),
            Position::new(end_line, end_char),
        )
    }

    /// Zero-width range at a position
    #[must_use]
    pub const fn caret(at: Position) -> Self {
        Self { start: at, end: at }
    }

    /// True when start and end coincide
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl From<[Position; 2]> for Range {
    fn from(value: [Position; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

impl From<Range> for [Position; 2] {
    fn from(value: Range) -> Self {
        [value.start, value.end]
    }
}

impl std::fmt::Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// A selection keeps its direction: `anchor` stays put, `active` is the caret
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    /// Where the selection started
    pub anchor: Position,
    /// Where the caret is
    pub active: Position,
}

impl Selection {
    /// Create a new selection
    #[must_use]
    pub const fn new(anchor: Position, active: Position) -> Self {
        Self { anchor, active }
    }

    /// Collapsed selection (plain cursor)
    #[must_use]
    pub const fn cursor(at: Position) -> Self {
        Self {
            anchor: at,
            active: at,
        }
    }

    /// Covered range, ordered
    #[must_use]
    pub fn range(&self) -> Range {
        Range::new(self.anchor, self.active)
    }

    /// True when the selection covers text right-to-left
    #[must_use]
    pub fn is_reversed(&self) -> bool {
        self.active < self.anchor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_ordering() {
        assert!(Position::new(0, 5) < Position::new(1, 0));
        assert!(Position::new(2, 1) < Position::new(2, 3));
    }

    #[test]
    fn test_range_orders_endpoints() {
        let r = Range::new(Position::new(3, 0), Position::new(1, 4));
        assert_eq!(r.start, Position::new(1, 4));
        assert_eq!(r.end, Position::new(3, 0));
    }

    #[test]
    fn test_range_wire_format() {
        let r = Range::from_coords(0, 1, 2, 3);
        let json = serde_json::to_value(r).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{"line": 0, "character": 1}, {"line": 2, "character": 3}])
        );
        let back: Range = serde_json::from_value(json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_selection_direction() {
        let s = Selection::new(Position::new(4, 2), Position::new(1, 0));
        assert!(s.is_reversed());
        assert_eq!(s.range().start, Position::new(1, 0));
        assert!(Selection::cursor(Position::new(1, 1)).range().is_empty());
    }
}
