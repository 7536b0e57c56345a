//! In-memory mirror of a document's text.
//!
//! The shadow buffer is the single place buffer text is mutated during a
//! replay. Line/character positions are translated to absolute offsets by
//! counting `'\n'` occurrences up to the target line and then adding the
//! character column. A position that cannot be translated leaves the buffer
//! untouched: one bad edit must not abort the rest of a replay.

use crate::position::{Position, Range};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Position translation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShadowError {
    /// The buffer has fewer lines than the position asks for
    #[error("line {line} out of bounds (buffer has {lines} lines)")]
    LineOutOfBounds {
        /// Requested line
        line: u32,
        /// Lines present
        lines: usize,
    },

    /// The character column runs past the end of the buffer
    #[error("position {position} runs past end of buffer")]
    OffsetOutOfBounds {
        /// Requested position
        position: Position,
    },

    /// Range end translates before its start
    #[error("range {range} ends before it starts")]
    ReversedRange {
        /// Offending range
        range: Range,
    },
}

/// Mutable text buffer with position translation
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShadowDocument {
    text: String,
}

impl ShadowDocument {
    /// Create a buffer holding `text`
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Current content
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the whole content
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Consume into the content
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }

    /// Number of lines (a trailing newline opens a final empty line)
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.text.matches('\n').count() + 1
    }

    /// Translate a position to a byte offset into the buffer
    ///
    /// # Errors
    ///
    /// Returns error if the line does not exist or the column runs past the
    /// end of the buffer
    pub fn offset_of(&self, position: Position) -> Result<usize, ShadowError> {
        let line_start = if position.line == 0 {
            0
        } else {
            let n = usize::try_from(position.line - 1).unwrap_or(usize::MAX);
            self.text
                .match_indices('\n')
                .nth(n)
                .map(|(index, _)| index + 1)
                .ok_or(ShadowError::LineOutOfBounds {
                    line: position.line,
                    lines: self.line_count(),
                })?
        };

        let rest = &self.text[line_start..];
        let character = usize::try_from(position.character).unwrap_or(usize::MAX);
        // Columns may run onto following lines; only the buffer end is a hard limit.
        match rest.char_indices().nth(character) {
            Some((index, _)) => Ok(line_start + index),
            None if rest.chars().count() == character => Ok(self.text.len()),
            None => Err(ShadowError::OffsetOutOfBounds { position }),
        }
    }

    /// Insert `substitute` at `position`
    ///
    /// # Errors
    ///
    /// Returns error if the position cannot be translated; the buffer is unchanged
    pub fn try_replace_with_position(
        &mut self,
        position: Position,
        substitute: &str,
    ) -> Result<(), ShadowError> {
        let start = self.offset_of(position)?;
        self.text.insert_str(start, substitute);
        Ok(())
    }

    /// Replace the text covered by `range` with `substitute`
    ///
    /// # Errors
    ///
    /// Returns error if either endpoint cannot be translated; the buffer is unchanged
    pub fn try_replace_with_range(&mut self, range: Range, substitute: &str) -> Result<(), ShadowError> {
        let start = self.offset_of(range.start)?;
        let end = self.offset_of(range.end)?;
        if end < start {
            return Err(ShadowError::ReversedRange { range });
        }
        self.text.replace_range(start..end, substitute);
        Ok(())
    }

    /// Insert at a position, logging and skipping on failure.
    ///
    /// Returns whether the edit was applied.
    pub fn replace_with_position(&mut self, position: Position, substitute: &str) -> bool {
        match self.try_replace_with_position(position, substitute) {
            Ok(()) => true,
            Err(err) => {
                warn!(%position, substitute, error = %err, "replace failed");
                false
            }
        }
    }

    /// Replace a range, logging and skipping on failure.
    ///
    /// Returns whether the edit was applied.
    pub fn replace_with_range(&mut self, range: Range, substitute: &str) -> bool {
        match self.try_replace_with_range(range, substitute) {
            Ok(()) => true,
            Err(err) => {
                warn!(%range, substitute, error = %err, "replace with range failed");
                false
            }
        }
    }
}

impl From<&str> for ShadowDocument {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_zero_is_character_offset() {
        let doc = ShadowDocument::new("abcdef");
        assert_eq!(doc.offset_of(Position::new(0, 3)), Ok(3));
    }

    #[test]
    fn test_offset_counts_newlines() {
        let doc = ShadowDocument::new("ab\ncd\nef");
        assert_eq!(doc.offset_of(Position::new(1, 0)), Ok(3));
        assert_eq!(doc.offset_of(Position::new(2, 1)), Ok(7));
        assert_eq!(doc.offset_of(Position::new(2, 2)), Ok(8));
    }

    #[test]
    fn test_offset_handles_multibyte() {
        let doc = ShadowDocument::new("é\nñx");
        assert_eq!(doc.offset_of(Position::new(1, 1)), Ok("é\nñ".len()));
    }

    #[test]
    fn test_insert_at_position() {
        let mut doc = ShadowDocument::new("fn main() {}\n");
        assert!(doc.replace_with_position(Position::new(1, 0), "hello"));
        assert_eq!(doc.text(), "fn main() {}\nhello");
    }

    #[test]
    fn test_replace_range() {
        let mut doc = ShadowDocument::new("one\ntwo\nthree");
        assert!(doc.replace_with_range(Range::from_coords(1, 0, 2, 3), "2\n3"));
        assert_eq!(doc.text(), "one\n2\n3ee");
    }

    #[test]
    fn test_delete_range() {
        let mut doc = ShadowDocument::new("hello world");
        assert!(doc.replace_with_range(Range::from_coords(0, 5, 0, 11), ""));
        assert_eq!(doc.text(), "hello");
    }

    #[test]
    fn test_missing_line_leaves_buffer() {
        let mut doc = ShadowDocument::new("only line");
        assert!(!doc.replace_with_position(Position::new(4, 0), "x"));
        assert_eq!(doc.text(), "only line");
        assert!(matches!(
            doc.try_replace_with_position(Position::new(4, 0), "x"),
            Err(ShadowError::LineOutOfBounds { line: 4, lines: 1 })
        ));
    }

    #[test]
    fn test_column_past_end_leaves_buffer() {
        let mut doc = ShadowDocument::new("abc");
        assert!(!doc.replace_with_range(Range::from_coords(0, 1, 0, 9), ""));
        assert_eq!(doc.text(), "abc");
    }

    #[test]
    fn test_reversed_range_rejected() {
        let mut doc = ShadowDocument::new("abcdef");
        let range = Range {
            start: Position::new(0, 4),
            end: Position::new(0, 1),
        };
        assert!(matches!(
            doc.try_replace_with_range(range, "x"),
            Err(ShadowError::ReversedRange { .. })
        ));
        assert_eq!(doc.text(), "abcdef");
    }

    #[test]
    fn test_line_count() {
        assert_eq!(ShadowDocument::new("").line_count(), 1);
        assert_eq!(ShadowDocument::new("a\nb\n").line_count(), 3);
    }

    proptest::proptest! {
        #[test]
        fn prop_insert_at_end_appends(base in "[a-z\\n]{0,40}", insert in "[a-z]{0,10}") {
            let mut doc = ShadowDocument::new(base.clone());
            let last_line = u32::try_from(base.matches('\n').count()).unwrap();
            let tail = base.rsplit('\n').next().unwrap_or("");
            let col = u32::try_from(tail.chars().count()).unwrap();
            proptest::prop_assert!(doc.replace_with_position(Position::new(last_line, col), &insert));
            proptest::prop_assert_eq!(doc.text(), format!("{base}{insert}"));
        }

        #[test]
        fn prop_failed_edit_is_noop(base in "[a-z\\n]{0,40}", line in 50u32..100) {
            let mut doc = ShadowDocument::new(base.clone());
            proptest::prop_assert!(!doc.replace_with_position(Position::new(line, 0), "zzz"));
            proptest::prop_assert_eq!(doc.text(), base.as_str());
        }
    }
}
