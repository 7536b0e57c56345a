//! Event types for the editor event log.
//!
//! Every event names the document it touches by [`DocumentId`] and carries a
//! timestamp whose meaning is fixed by the type parameter: [`RelativeMs`] for
//! logs and slices, [`EpochMs`](codio_core::EpochMs) for capture and scheduling.

use codio_core::{DocumentId, Range, RelativeMs, Selection};
use serde::{Deserialize, Serialize};

/// Event kind - the tag of an event's payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// Text edits
    Text,
    /// Selection change
    Selection,
    /// Viewport change
    VisibleRange,
    /// Active document switch
    Editor,
}

impl EventKind {
    /// All kinds, in wire order
    pub const ALL: [EventKind; 4] = [Self::Text, Self::Selection, Self::VisibleRange, Self::Editor];

    /// Wire tag
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Selection => "selection",
            Self::VisibleRange => "visibleRange",
            Self::Editor => "editor",
        }
    }

    /// Parse a wire tag; unknown tags yield `None`
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One replacement inside a text change
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentChange {
    /// Range being replaced (empty for a pure insert)
    pub range: Range,
    /// Replacement text (empty for a pure delete)
    pub text: String,
}

impl ContentChange {
    /// Create a change
    #[must_use]
    pub fn new(range: Range, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }
}

/// Snapshot carried by an active-document switch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentSwitch {
    /// First time this document was seen during the recording
    pub is_initial: bool,
    /// Full text at switch time
    pub content: String,
    /// Editor column the document is shown in
    pub view_column: u32,
    /// Viewport at switch time
    pub visible_range: Option<Range>,
    /// Selections at switch time
    pub selections: Vec<Selection>,
}

/// Event payload
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventPayload {
    /// Ordered edits to apply to the buffer
    TextChange {
        /// Changes, applied in order
        changes: Vec<ContentChange>,
    },
    /// Current selections
    SelectionChange {
        /// Selections, primary first
        selections: Vec<Selection>,
    },
    /// Current viewport
    VisibleRangeChange {
        /// Visible range
        visible_range: Range,
    },
    /// Document became active
    DocumentSwitch(DocumentSwitch),
}

impl EventPayload {
    /// Tag of this payload
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::TextChange { .. } => EventKind::Text,
            Self::SelectionChange { .. } => EventKind::Selection,
            Self::VisibleRangeChange { .. } => EventKind::VisibleRange,
            Self::DocumentSwitch(_) => EventKind::Editor,
        }
    }
}

/// An editor event
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Event<T = RelativeMs> {
    /// Document the event applies to
    pub document: DocumentId,
    /// When the event happened
    pub time: T,
    /// What happened
    pub payload: EventPayload,
}

impl<T> Event<T> {
    /// Create an event
    pub fn new(document: DocumentId, time: T, payload: EventPayload) -> Self {
        Self {
            document,
            time,
            payload,
        }
    }

    /// Text change event
    pub fn text(document: DocumentId, time: T, changes: Vec<ContentChange>) -> Self {
        Self::new(document, time, EventPayload::TextChange { changes })
    }

    /// Selection change event
    pub fn selection(document: DocumentId, time: T, selections: Vec<Selection>) -> Self {
        Self::new(document, time, EventPayload::SelectionChange { selections })
    }

    /// Visible range change event
    pub fn visible_range(document: DocumentId, time: T, visible_range: Range) -> Self {
        Self::new(document, time, EventPayload::VisibleRangeChange { visible_range })
    }

    /// Active document switch event
    pub fn switch(document: DocumentId, time: T, switch: DocumentSwitch) -> Self {
        Self::new(document, time, EventPayload::DocumentSwitch(switch))
    }

    /// Payload tag
    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    /// Same event on another time axis
    pub fn with_time<U>(self, time: U) -> Event<U> {
        Event {
            document: self.document,
            time,
            payload: self.payload,
        }
    }

    /// Same event naming a different document
    #[must_use]
    pub fn with_document(mut self, document: DocumentId) -> Self {
        self.document = document;
        self
    }
}
