//! Contract between the recorder and the editor it observes.
//!
//! The host reports editor changes as [`Notification`] values; the recorder
//! only ever sees document ids and plain data, never editor handles.

use codio_core::{DocumentId, Range, Selection};
use codio_log::{ContentChange, LogError};
use indexmap::IndexSet;
use std::collections::HashSet;
use thiserror::Error;

/// Notification stream the recorder can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    /// Active editor changes
    ActiveEditor,
    /// Document text changes
    TextChange,
    /// Selection changes
    Selection,
    /// Viewport changes
    VisibleRange,
}

impl Channel {
    /// Every channel
    pub const ALL: [Channel; 4] = [
        Self::ActiveEditor,
        Self::TextChange,
        Self::Selection,
        Self::VisibleRange,
    ];
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ActiveEditor => "active-editor",
            Self::TextChange => "text-change",
            Self::Selection => "selection",
            Self::VisibleRange => "visible-range",
        };
        f.write_str(name)
    }
}

/// State of the active editor at one instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorSnapshot {
    /// Document shown
    pub document: DocumentId,
    /// Full text
    pub content: String,
    /// View column
    pub view_column: u32,
    /// Selections, primary first
    pub selections: Vec<Selection>,
    /// Viewport
    pub visible_range: Option<Range>,
}

impl EditorSnapshot {
    /// Snapshot of a document in column 1 without view state
    #[must_use]
    pub fn new(document: DocumentId, content: impl Into<String>) -> Self {
        Self {
            document,
            content: content.into(),
            view_column: 1,
            selections: Vec::new(),
            visible_range: None,
        }
    }
}

/// A change reported by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Another editor became active; `None` when a document was replaced in place
    ActiveEditorChanged(Option<EditorSnapshot>),
    /// Text edits, in the order the editor applied them
    TextChanged {
        /// Document edited
        document: DocumentId,
        /// Edits
        changes: Vec<ContentChange>,
    },
    /// Selections changed
    SelectionChanged {
        /// Document
        document: DocumentId,
        /// Selections, primary first
        selections: Vec<Selection>,
    },
    /// Viewport changed
    VisibleRangeChanged {
        /// Document
        document: DocumentId,
        /// First visible range, if any
        visible_range: Option<Range>,
    },
}

impl Notification {
    /// Channel the notification arrives on
    #[must_use]
    pub const fn channel(&self) -> Channel {
        match self {
            Self::ActiveEditorChanged(_) => Channel::ActiveEditor,
            Self::TextChanged { .. } => Channel::TextChange,
            Self::SelectionChanged { .. } => Channel::Selection,
            Self::VisibleRangeChanged { .. } => Channel::VisibleRange,
        }
    }
}

/// Recording error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The host refused a subscription
    #[error("cannot subscribe to {channel}: {reason}")]
    Subscribe {
        /// Channel
        channel: Channel,
        /// Reason given by the host
        reason: String,
    },

    /// A recording is already running
    #[error("already recording")]
    AlreadyRecording,

    /// No recording is running
    #[error("not recording")]
    NotRecording,

    /// The recording must be stopped first
    #[error("recording still in progress")]
    StillRecording,

    /// Encoding or file failure
    #[error(transparent)]
    Log(#[from] LogError),
}

impl From<std::io::Error> for RecordError {
    fn from(err: std::io::Error) -> Self {
        Self::Log(err.into())
    }
}

/// Record result type
pub type RecordResult<T> = Result<T, RecordError>;

/// The editor being recorded
pub trait EditorHost {
    /// Editor currently focused, if any
    fn active_editor(&self) -> Option<EditorSnapshot>;

    /// Start delivering notifications on `channel`
    ///
    /// # Errors
    ///
    /// Returns error if the host cannot deliver the channel
    fn subscribe(&mut self, channel: Channel) -> RecordResult<()>;

    /// Stop delivering notifications on `channel`
    fn unsubscribe(&mut self, channel: Channel);
}

/// Host with a settable active editor that tracks subscriptions
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    active: Option<EditorSnapshot>,
    subscribed: IndexSet<Channel>,
    refused: HashSet<Channel>,
}

impl MemoryHost {
    /// Host with no active editor
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Host showing `editor`
    #[must_use]
    pub fn with_active(editor: EditorSnapshot) -> Self {
        Self {
            active: Some(editor),
            ..Self::default()
        }
    }

    /// Change the active editor
    pub fn set_active(&mut self, editor: Option<EditorSnapshot>) {
        self.active = editor;
    }

    /// Make `subscribe` fail for `channel`
    pub fn refuse(&mut self, channel: Channel) {
        self.refused.insert(channel);
    }

    /// Whether `channel` is subscribed
    #[must_use]
    pub fn is_subscribed(&self, channel: Channel) -> bool {
        self.subscribed.contains(&channel)
    }

    /// Subscribed channels in subscription order
    pub fn subscriptions(&self) -> impl Iterator<Item = &Channel> {
        self.subscribed.iter()
    }
}

impl EditorHost for MemoryHost {
    fn active_editor(&self) -> Option<EditorSnapshot> {
        self.active.clone()
    }

    fn subscribe(&mut self, channel: Channel) -> RecordResult<()> {
        if self.refused.contains(&channel) {
            return Err(RecordError::Subscribe {
                channel,
                reason: "refused by host".to_string(),
            });
        }
        self.subscribed.insert(channel);
        Ok(())
    }

    fn unsubscribe(&mut self, channel: Channel) {
        self.subscribed.shift_remove(&channel);
    }
}
