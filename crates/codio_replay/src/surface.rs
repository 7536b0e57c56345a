//! The editing surface a replay writes to.
//!
//! Replays never hold a live editor handle. Documents are addressed by
//! [`DocumentId`] and every call goes through [`DocumentSurface`], so the
//! same player drives a real editor binding or the in-memory surface used by
//! tests and the CLI.

use crate::frame::{Frame, FrameEntry};
use codio_core::{DocumentId, Range, Selection, ShadowDocument, ShadowError, Timepoint};
use codio_log::{ContentChange, Event, EventPayload};
use indexmap::IndexMap;
use std::collections::HashSet;
use thiserror::Error;
use tracing::warn;

/// Surface operation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    /// The document could not be opened
    #[error("cannot open {document}: {reason}")]
    Open {
        /// Document
        document: DocumentId,
        /// Reason given by the surface
        reason: String,
    },

    /// The document must be opened first
    #[error("{document} is not open")]
    NotOpen {
        /// Document
        document: DocumentId,
    },

    /// An edit did not fit the document
    #[error("edit rejected by {document}: {source}")]
    Edit {
        /// Document
        document: DocumentId,
        /// Translation failure
        #[source]
        source: ShadowError,
    },
}

/// Surface result type
pub type SurfaceResult<T> = Result<T, SurfaceError>;

/// Editor operations needed to show a frame or replay an event
pub trait DocumentSurface: Send {
    /// Open (or focus) a document in a view column
    ///
    /// # Errors
    ///
    /// Returns error if the document cannot be shown
    fn open_document(&mut self, document: &DocumentId, column: u32) -> SurfaceResult<()>;

    /// Close a document; closing one that is not open does nothing
    ///
    /// # Errors
    ///
    /// Returns error if the surface refuses to close it
    fn close_document(&mut self, document: &DocumentId) -> SurfaceResult<()>;

    /// Replace the whole text of an open document
    ///
    /// # Errors
    ///
    /// Returns error if the document is not open
    fn set_text(&mut self, document: &DocumentId, text: &str) -> SurfaceResult<()>;

    /// Apply ordered edits to an open document
    ///
    /// # Errors
    ///
    /// Returns error if the document is not open or an edit does not fit
    fn apply_changes(&mut self, document: &DocumentId, changes: &[ContentChange]) -> SurfaceResult<()>;

    /// Replace the selections of an open document
    ///
    /// # Errors
    ///
    /// Returns error if the document is not open
    fn set_selections(&mut self, document: &DocumentId, selections: &[Selection]) -> SurfaceResult<()>;

    /// Scroll an open document so `range` is visible
    ///
    /// # Errors
    ///
    /// Returns error if the document is not open
    fn reveal_range(&mut self, document: &DocumentId, range: Range) -> SurfaceResult<()>;

    /// Drop the selection of the focused document
    ///
    /// # Errors
    ///
    /// Returns error if the surface rejects the call
    fn clear_selection(&mut self) -> SurfaceResult<()>;
}

/// Replay a single event onto a surface
///
/// # Errors
///
/// Returns the first surface failure
pub fn apply_event<S, T>(surface: &mut S, event: &Event<T>) -> SurfaceResult<()>
where
    S: DocumentSurface + ?Sized,
    T: Timepoint,
{
    let id = &event.document;
    match &event.payload {
        EventPayload::TextChange { changes } => surface.apply_changes(id, changes),
        EventPayload::SelectionChange { selections } => surface.set_selections(id, selections),
        EventPayload::VisibleRangeChange { visible_range } => surface.reveal_range(id, *visible_range),
        EventPayload::DocumentSwitch(switch) => {
            surface.open_document(id, switch.view_column)?;
            if switch.is_initial {
                surface.set_text(id, &switch.content)?;
            }
            if !switch.selections.is_empty() {
                surface.set_selections(id, &switch.selections)?;
            }
            if let Some(range) = switch.visible_range {
                surface.reveal_range(id, range)?;
            }
            Ok(())
        }
    }
}

/// Show every document of a frame, most recently touched last.
///
/// A failing document is logged and skipped; the rest of the frame is still
/// applied. Returns the failures.
pub fn apply_frame<S>(surface: &mut S, frame: &Frame) -> Vec<SurfaceError>
where
    S: DocumentSurface + ?Sized,
{
    let mut failures = Vec::new();
    for (id, entry) in frame.apply_order() {
        if let Err(err) = show_entry(surface, id, entry) {
            warn!(document = %id, error = %err, "failed to apply frame entry");
            failures.push(err);
        }
    }
    failures
}

/// Close every document in `documents` that `frame` does not hold.
///
/// Run before [`apply_frame`] so a seek leaves the same documents open
/// whatever an earlier seek or playback opened.
pub fn close_absent<'a, S>(
    surface: &mut S,
    documents: impl IntoIterator<Item = &'a DocumentId>,
    frame: &Frame,
) -> Vec<SurfaceError>
where
    S: DocumentSurface + ?Sized,
{
    let mut failures = Vec::new();
    for id in documents {
        if frame.contains(id) {
            continue;
        }
        if let Err(err) = surface.close_document(id) {
            warn!(document = %id, error = %err, "failed to close document");
            failures.push(err);
        }
    }
    failures
}

fn show_entry<S>(surface: &mut S, id: &DocumentId, entry: &FrameEntry) -> SurfaceResult<()>
where
    S: DocumentSurface + ?Sized,
{
    surface.open_document(id, entry.view_column)?;
    surface.set_text(id, entry.text())?;
    if !entry.selections.is_empty() {
        surface.set_selections(id, &entry.selections)?;
    }
    if let Some(range) = entry.visible_range {
        surface.reveal_range(id, range)?;
    }
    Ok(())
}

/// A document held by [`MemorySurface`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenDocument {
    /// Text buffer
    pub buffer: ShadowDocument,
    /// View column
    pub column: u32,
    /// Selections
    pub selections: Vec<Selection>,
    /// Last revealed range
    pub visible_range: Option<Range>,
}

/// In-memory surface
#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    documents: IndexMap<DocumentId, OpenDocument>,
    focused: Option<DocumentId>,
    unavailable: HashSet<DocumentId>,
}

impl MemorySurface {
    /// Create an empty surface
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `open_document` fail for `document`
    pub fn mark_unavailable(&mut self, document: DocumentId) {
        self.unavailable.insert(document);
    }

    /// An open document
    #[must_use]
    pub fn document(&self, document: &DocumentId) -> Option<&OpenDocument> {
        self.documents.get(document)
    }

    /// Text of an open document
    #[must_use]
    pub fn text_of(&self, document: &DocumentId) -> Option<&str> {
        self.documents.get(document).map(|d| d.buffer.text())
    }

    /// Focused document
    #[must_use]
    pub fn focused(&self) -> Option<&DocumentId> {
        self.focused.as_ref()
    }

    /// Open documents in the order they were first opened
    pub fn documents(&self) -> impl Iterator<Item = (&DocumentId, &OpenDocument)> {
        self.documents.iter()
    }

    fn open_mut(&mut self, document: &DocumentId) -> SurfaceResult<&mut OpenDocument> {
        self.documents.get_mut(document).ok_or_else(|| SurfaceError::NotOpen {
            document: document.clone(),
        })
    }
}

impl DocumentSurface for MemorySurface {
    fn open_document(&mut self, document: &DocumentId, column: u32) -> SurfaceResult<()> {
        if self.unavailable.contains(document) {
            return Err(SurfaceError::Open {
                document: document.clone(),
                reason: "document unavailable".to_string(),
            });
        }
        self.documents.entry(document.clone()).or_default().column = column;
        self.focused = Some(document.clone());
        Ok(())
    }

    fn close_document(&mut self, document: &DocumentId) -> SurfaceResult<()> {
        self.documents.shift_remove(document);
        if self.focused.as_ref() == Some(document) {
            self.focused = None;
        }
        Ok(())
    }

    fn set_text(&mut self, document: &DocumentId, text: &str) -> SurfaceResult<()> {
        self.open_mut(document)?.buffer.set_text(text);
        Ok(())
    }

    fn apply_changes(&mut self, document: &DocumentId, changes: &[ContentChange]) -> SurfaceResult<()> {
        let open = self.open_mut(document)?;
        let mut buffer = open.buffer.clone();
        for change in changes {
            buffer
                .try_replace_with_range(change.range, &change.text)
                .map_err(|source| SurfaceError::Edit {
                    document: document.clone(),
                    source,
                })?;
        }
        open.buffer = buffer;
        Ok(())
    }

    fn set_selections(&mut self, document: &DocumentId, selections: &[Selection]) -> SurfaceResult<()> {
        self.open_mut(document)?.selections = selections.to_vec();
        Ok(())
    }

    fn reveal_range(&mut self, document: &DocumentId, range: Range) -> SurfaceResult<()> {
        self.open_mut(document)?.visible_range = Some(range);
        Ok(())
    }

    fn clear_selection(&mut self) -> SurfaceResult<()> {
        if let Some(focused) = self.focused.clone() {
            self.open_mut(&focused)?.selections.clear();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codio_core::{Position, RelativeMs};
    use codio_log::DocumentSwitch;

    fn doc(path: &str) -> DocumentId {
        DocumentId::new(path)
    }

    #[test]
    fn test_edits_require_open_document() {
        let mut surface = MemorySurface::new();
        let err = surface.set_text(&doc("a.rs"), "x").unwrap_err();
        assert_eq!(err, SurfaceError::NotOpen { document: doc("a.rs") });
    }

    #[test]
    fn test_apply_event_text_and_selection() {
        let mut surface = MemorySurface::new();
        surface.open_document(&doc("a.rs"), 1).unwrap();
        let text = Event::text(
            doc("a.rs"),
            RelativeMs(1),
            vec![ContentChange::new(Range::caret(Position::new(0, 0)), "hello")],
        );
        apply_event(&mut surface, &text).unwrap();
        let selection = Event::selection(doc("a.rs"), RelativeMs(2), vec![Selection::cursor(Position::new(0, 5))]);
        apply_event(&mut surface, &selection).unwrap();

        let open = surface.document(&doc("a.rs")).unwrap();
        assert_eq!(open.buffer.text(), "hello");
        assert_eq!(open.selections.len(), 1);

        surface.clear_selection().unwrap();
        assert!(surface.document(&doc("a.rs")).unwrap().selections.is_empty());
    }

    #[test]
    fn test_apply_event_bad_edit_reported() {
        let mut surface = MemorySurface::new();
        surface.open_document(&doc("a.rs"), 1).unwrap();
        let text = Event::text(
            doc("a.rs"),
            RelativeMs(1),
            vec![ContentChange::new(Range::caret(Position::new(4, 0)), "x")],
        );
        assert!(matches!(
            apply_event(&mut surface, &text),
            Err(SurfaceError::Edit { .. })
        ));
    }

    #[test]
    fn test_initial_switch_opens_with_content() {
        let mut surface = MemorySurface::new();
        let switch = Event::switch(
            doc("b.rs"),
            RelativeMs(3),
            DocumentSwitch {
                is_initial: true,
                content: "mod b;".to_string(),
                view_column: 2,
                visible_range: None,
                selections: Vec::new(),
            },
        );
        apply_event(&mut surface, &switch).unwrap();
        assert_eq!(surface.text_of(&doc("b.rs")), Some("mod b;"));
        assert_eq!(surface.focused(), Some(&doc("b.rs")));
    }

    #[test]
    fn test_apply_frame_focuses_latest_and_collects_failures() {
        let mut frame = Frame::new();
        frame.insert(doc("late.rs"), FrameEntry::new("late", 1, 5));
        frame.insert(doc("gone.rs"), FrameEntry::new("gone", 1, 2));
        frame.insert(doc("early.rs"), FrameEntry::new("early", 2, 1));

        let mut surface = MemorySurface::new();
        surface.mark_unavailable(doc("gone.rs"));
        let failures = apply_frame(&mut surface, &frame);

        assert_eq!(failures.len(), 1);
        assert_eq!(surface.focused(), Some(&doc("late.rs")));
        assert_eq!(surface.text_of(&doc("early.rs")), Some("early"));
        assert!(surface.text_of(&doc("gone.rs")).is_none());
    }

    #[test]
    fn test_failed_change_list_leaves_buffer_untouched() {
        let mut surface = MemorySurface::new();
        surface.open_document(&doc("a.rs"), 1).unwrap();
        surface.set_text(&doc("a.rs"), "abc").unwrap();
        let changes = vec![
            ContentChange::new(Range::caret(Position::new(0, 0)), "x"),
            ContentChange::new(Range::caret(Position::new(7, 0)), "y"),
        ];
        assert!(surface.apply_changes(&doc("a.rs"), &changes).is_err());
        assert_eq!(surface.text_of(&doc("a.rs")), Some("abc"));
    }

    #[test]
    fn test_close_absent_keeps_frame_documents() {
        let mut frame = Frame::new();
        frame.insert(doc("a.rs"), FrameEntry::new("a", 1, 0));

        let mut surface = MemorySurface::new();
        surface.open_document(&doc("a.rs"), 1).unwrap();
        surface.open_document(&doc("b.rs"), 2).unwrap();
        let known = [doc("a.rs"), doc("b.rs"), doc("never.rs")];

        assert!(close_absent(&mut surface, &known, &frame).is_empty());
        assert!(surface.document(&doc("a.rs")).is_some());
        assert!(surface.document(&doc("b.rs")).is_none());
        assert_eq!(surface.focused(), None);
    }
}
