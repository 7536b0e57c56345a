//! Frames: snapshots of every tracked document at one instant.

use codio_core::{DocumentId, Range, Selection, ShadowDocument};
use indexmap::IndexMap;
use std::collections::BTreeSet;

/// State of a single document inside a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameEntry {
    /// Shadow buffer holding the document text
    pub document: ShadowDocument,
    /// Editor column the document is shown in
    pub view_column: u32,
    /// Logical clock of the last event that touched the document
    pub last_action_index: u64,
    /// Selections, primary first
    pub selections: Vec<Selection>,
    /// Viewport
    pub visible_range: Option<Range>,
}

impl FrameEntry {
    /// Create an entry without view state
    #[must_use]
    pub fn new(text: impl Into<String>, view_column: u32, last_action_index: u64) -> Self {
        Self {
            document: ShadowDocument::new(text),
            view_column,
            last_action_index,
            selections: Vec::new(),
            visible_range: None,
        }
    }

    /// Attach selections
    #[must_use]
    pub fn with_selections(mut self, selections: Vec<Selection>) -> Self {
        self.selections = selections;
        self
    }

    /// Attach a viewport
    #[must_use]
    pub fn with_visible_range(mut self, visible_range: Option<Range>) -> Self {
        self.visible_range = visible_range;
        self
    }

    /// Document text
    #[must_use]
    pub fn text(&self) -> &str {
        self.document.text()
    }
}

/// Snapshot of all known documents, in the order they were first seen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    entries: IndexMap<DocumentId, FrameEntry>,
}

impl Frame {
    /// Create an empty frame
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Insert or replace a document
    pub fn insert(&mut self, document: DocumentId, entry: FrameEntry) -> Option<FrameEntry> {
        self.entries.insert(document, entry)
    }

    /// Look up a document
    #[must_use]
    pub fn get(&self, document: &DocumentId) -> Option<&FrameEntry> {
        self.entries.get(document)
    }

    /// Look up a document mutably
    pub fn get_mut(&mut self, document: &DocumentId) -> Option<&mut FrameEntry> {
        self.entries.get_mut(document)
    }

    /// Whether the frame tracks `document`
    #[must_use]
    pub fn contains(&self, document: &DocumentId) -> bool {
        self.entries.contains_key(document)
    }

    /// Text of a document
    #[must_use]
    pub fn text_of(&self, document: &DocumentId) -> Option<&str> {
        self.entries.get(document).map(FrameEntry::text)
    }

    /// Entries in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&DocumentId, &FrameEntry)> {
        self.entries.iter()
    }

    /// Document ids in first-seen order
    pub fn documents(&self) -> impl Iterator<Item = &DocumentId> {
        self.entries.keys()
    }

    /// Number of documents
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the frame tracks no documents
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest logical clock in the frame
    #[must_use]
    pub fn clock(&self) -> u64 {
        self.entries
            .values()
            .map(|e| e.last_action_index)
            .max()
            .unwrap_or(0)
    }

    /// Entries ordered by last action, so the most recently touched comes last.
    ///
    /// Ties keep first-seen order.
    #[must_use]
    pub fn apply_order(&self) -> Vec<(&DocumentId, &FrameEntry)> {
        let mut ordered: Vec<_> = self.entries.iter().collect();
        ordered.sort_by_key(|(_, entry)| entry.last_action_index);
        ordered
    }

    /// Document shown last when the frame is applied
    #[must_use]
    pub fn focused(&self) -> Option<&DocumentId> {
        self.apply_order().last().map(|(id, _)| *id)
    }

    /// Whether both frames hold the same documents with the same text
    #[must_use]
    pub fn same_text(&self, other: &Frame) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(id, entry)| other.text_of(id) == Some(entry.text()))
    }

    /// Stable content digest over every field of every entry
    #[must_use]
    pub fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for (id, entry) in &self.entries {
            hasher.update(id.as_str().as_bytes());
            hasher.update(&[0]);
            hasher.update(entry.text().as_bytes());
            hasher.update(&[0]);
            hasher.update(&entry.view_column.to_le_bytes());
            hasher.update(&entry.last_action_index.to_le_bytes());
            for selection in &entry.selections {
                for position in [selection.anchor, selection.active] {
                    hasher.update(&position.line.to_le_bytes());
                    hasher.update(&position.character.to_le_bytes());
                }
            }
            if let Some(range) = entry.visible_range {
                for position in [range.start, range.end] {
                    hasher.update(&position.line.to_le_bytes());
                    hasher.update(&position.character.to_le_bytes());
                }
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}

/// Difference between two frames
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameDiff {
    /// Documents only in the later frame
    pub added: BTreeSet<DocumentId>,
    /// Documents only in the earlier frame
    pub removed: BTreeSet<DocumentId>,
    /// Documents whose text differs
    pub text_changed: BTreeSet<DocumentId>,
    /// Documents whose view state (column, selections, viewport) differs
    pub view_changed: BTreeSet<DocumentId>,
}

impl FrameDiff {
    /// Compute diff between two frames
    #[must_use]
    pub fn compute(before: &Frame, after: &Frame) -> Self {
        let mut diff = Self::default();

        for (id, after_entry) in after.iter() {
            match before.get(id) {
                None => {
                    diff.added.insert(id.clone());
                }
                Some(before_entry) => {
                    if before_entry.text() != after_entry.text() {
                        diff.text_changed.insert(id.clone());
                    }
                    if before_entry.view_column != after_entry.view_column
                        || before_entry.selections != after_entry.selections
                        || before_entry.visible_range != after_entry.visible_range
                    {
                        diff.view_changed.insert(id.clone());
                    }
                }
            }
        }

        for id in before.documents() {
            if !after.contains(id) {
                diff.removed.insert(id.clone());
            }
        }

        diff
    }

    /// Check if there are any differences
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty()
            || !self.removed.is_empty()
            || !self.text_changed.is_empty()
            || !self.view_changed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codio_core::Position;

    fn id(path: &str) -> DocumentId {
        DocumentId::new(path)
    }

    #[test]
    fn test_frame_insert_and_lookup() {
        let mut frame = Frame::new();
        frame.insert(id("a.rs"), FrameEntry::new("fn a() {}", 1, 0));
        assert_eq!(frame.len(), 1);
        assert_eq!(frame.text_of(&id("a.rs")), Some("fn a() {}"));
        assert!(frame.text_of(&id("b.rs")).is_none());
    }

    #[test]
    fn test_apply_order_puts_latest_last() {
        let mut frame = Frame::new();
        frame.insert(id("a.rs"), FrameEntry::new("", 1, 4));
        frame.insert(id("b.rs"), FrameEntry::new("", 2, 1));
        frame.insert(id("c.rs"), FrameEntry::new("", 1, 1));
        let order: Vec<_> = frame.apply_order().into_iter().map(|(id, _)| id.clone()).collect();
        assert_eq!(order, vec![id("b.rs"), id("c.rs"), id("a.rs")]);
        assert_eq!(frame.focused(), Some(&id("a.rs")));
        assert_eq!(frame.clock(), 4);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut frame = Frame::new();
        frame.insert(id("a.rs"), FrameEntry::new("abc", 1, 0));
        let mut copy = frame.clone();
        copy.get_mut(&id("a.rs")).unwrap().document.set_text("changed");
        assert_eq!(frame.text_of(&id("a.rs")), Some("abc"));
    }

    #[test]
    fn test_digest_tracks_content() {
        let mut a = Frame::new();
        a.insert(id("a.rs"), FrameEntry::new("abc", 1, 0));
        let mut b = a.clone();
        assert_eq!(a.digest(), b.digest());

        b.get_mut(&id("a.rs")).unwrap().selections = vec![Selection::cursor(Position::new(0, 1))];
        assert_ne!(a.digest(), b.digest());
        assert!(a.same_text(&b));
    }

    #[test]
    fn test_frame_diff() {
        let mut before = Frame::new();
        before.insert(id("a.rs"), FrameEntry::new("a", 1, 0));
        before.insert(id("gone.rs"), FrameEntry::new("", 1, 0));

        let mut after = Frame::new();
        after.insert(id("a.rs"), FrameEntry::new("a2", 2, 1));
        after.insert(id("new.rs"), FrameEntry::new("", 1, 2));

        let diff = FrameDiff::compute(&before, &after);
        assert!(diff.has_changes());
        assert!(diff.added.contains(&id("new.rs")));
        assert!(diff.removed.contains(&id("gone.rs")));
        assert!(diff.text_changed.contains(&id("a.rs")));
        assert!(diff.view_changed.contains(&id("a.rs")));
        assert!(!FrameDiff::compute(&after, &after).has_changes());
    }
}
