//! Portable encoding of recorded timelines.
//!
//! The persisted form never embeds a live document handle: documents are
//! named by paths relative to the workspace root when they live under it,
//! absolute otherwise. Events are written as
//! `{ "type": <kind>, "data": { "path": ..., ... }, "time": <ms> }`.

use crate::event::{ContentChange, DocumentSwitch, Event, EventKind, EventPayload};
use chrono::{DateTime, Utc};
use codio_core::{CoreError, DocumentId, FORMAT_VERSION, Range, RelativeMs, Selection, Version};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Timeline file inside a recording directory
pub const TIMELINE_FILE: &str = "codio.json";

/// Metadata file inside a recording directory
pub const METADATA_FILE: &str = "meta.json";

/// Persisted log error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogError {
    /// An event's data does not match its kind
    #[error("malformed {kind} event at index {index}: {reason}")]
    MalformedEvent {
        /// Position in the log
        index: usize,
        /// Declared kind
        kind: String,
        /// Decoder message
        reason: String,
    },

    /// Event without a usable timestamp
    #[error("event at index {index} has no time")]
    MissingTime {
        /// Position in the log
        index: usize,
    },

    /// Written by a format version this build cannot read
    #[error("unsupported format version {found} (reader is {supported})")]
    UnsupportedVersion {
        /// Version in the file
        found: Version,
        /// Version of this reader
        supported: Version,
    },

    /// Underlying encoding or I/O failure
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<serde_json::Error> for LogError {
    fn from(err: serde_json::Error) -> Self {
        Self::Core(err.into())
    }
}

impl From<std::io::Error> for LogError {
    fn from(err: std::io::Error) -> Self {
        Self::Core(err.into())
    }
}

/// Log result type
pub type LogResult<T> = Result<T, LogError>;

/// One event as written to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedEvent {
    /// Wire tag (`text`, `selection`, `visibleRange`, `editor`)
    #[serde(rename = "type")]
    pub kind: String,
    /// Kind-specific payload, including the document `path`
    pub data: serde_json::Value,
    /// Relative offset; older files keep it as `data.time`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<RelativeMs>,
}

#[derive(Serialize, Deserialize)]
struct TextData {
    path: DocumentId,
    changes: Vec<ContentChange>,
}

#[derive(Serialize, Deserialize)]
struct SelectionData {
    path: DocumentId,
    selections: Vec<Selection>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VisibleRangeData {
    path: DocumentId,
    visible_range: Range,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditorData {
    path: DocumentId,
    is_initial: bool,
    content: String,
    view_column: u32,
    #[serde(default)]
    visible_range: Option<Range>,
    #[serde(default)]
    selections: Vec<Selection>,
}

impl PersistedEvent {
    /// Encode an event, naming its document relative to `root`
    ///
    /// # Errors
    ///
    /// Returns error if the payload cannot be encoded
    pub fn encode(event: &Event, root: Option<&Path>) -> LogResult<Self> {
        let path = event.document.normalize(root);
        let data = match &event.payload {
            EventPayload::TextChange { changes } => serde_json::to_value(TextData {
                path,
                changes: changes.clone(),
            })?,
            EventPayload::SelectionChange { selections } => serde_json::to_value(SelectionData {
                path,
                selections: selections.clone(),
            })?,
            EventPayload::VisibleRangeChange { visible_range } => {
                serde_json::to_value(VisibleRangeData {
                    path,
                    visible_range: *visible_range,
                })?
            }
            EventPayload::DocumentSwitch(switch) => serde_json::to_value(EditorData {
                path,
                is_initial: switch.is_initial,
                content: switch.content.clone(),
                view_column: switch.view_column,
                visible_range: switch.visible_range,
                selections: switch.selections.clone(),
            })?,
        };

        Ok(Self {
            kind: event.kind().as_str().to_string(),
            data,
            time: Some(event.time),
        })
    }

    /// Decode into an event whose document id is resolved against `root`.
    ///
    /// Returns `Ok(None)` for kinds this version does not replay.
    ///
    /// # Errors
    ///
    /// Returns error if the data does not match the declared kind
    pub fn decode(&self, index: usize, root: Option<&Path>) -> LogResult<Option<Event>> {
        let Some(kind) = EventKind::parse(&self.kind) else {
            return Ok(None);
        };
        let time = self.time().ok_or(LogError::MissingTime { index })?;

        let (path, payload) = match kind {
            EventKind::Text => {
                let data: TextData = self.data_as(index)?;
                (data.path, EventPayload::TextChange { changes: data.changes })
            }
            EventKind::Selection => {
                let data: SelectionData = self.data_as(index)?;
                (
                    data.path,
                    EventPayload::SelectionChange {
                        selections: data.selections,
                    },
                )
            }
            EventKind::VisibleRange => {
                let data: VisibleRangeData = self.data_as(index)?;
                (
                    data.path,
                    EventPayload::VisibleRangeChange {
                        visible_range: data.visible_range,
                    },
                )
            }
            EventKind::Editor => {
                let data: EditorData = self.data_as(index)?;
                (
                    data.path,
                    EventPayload::DocumentSwitch(DocumentSwitch {
                        is_initial: data.is_initial,
                        content: data.content,
                        view_column: data.view_column,
                        visible_range: data.visible_range,
                        selections: data.selections,
                    }),
                )
            }
        };

        Ok(Some(Event::new(path.resolve(root), time, payload)))
    }

    fn time(&self) -> Option<RelativeMs> {
        self.time.or_else(|| {
            self.data
                .get("time")
                .and_then(serde_json::Value::as_u64)
                .map(RelativeMs)
        })
    }

    fn data_as<D: DeserializeOwned>(&self, index: usize) -> LogResult<D> {
        serde_json::from_value(self.data.clone()).map_err(|err| LogError::MalformedEvent {
            index,
            kind: self.kind.clone(),
            reason: err.to_string(),
        })
    }
}

/// Encode a whole log relative to `root`
///
/// # Errors
///
/// Returns error if any event cannot be encoded
pub fn encode_events(events: &[Event], root: Option<&Path>) -> LogResult<Vec<PersistedEvent>> {
    events.iter().map(|e| PersistedEvent::encode(e, root)).collect()
}

/// Decode a whole log, skipping kinds this version does not replay
///
/// # Errors
///
/// Returns error on the first malformed event
pub fn decode_events(events: &[PersistedEvent], root: Option<&Path>) -> LogResult<Vec<Event>> {
    let mut decoded = Vec::with_capacity(events.len());
    for (index, persisted) in events.iter().enumerate() {
        match persisted.decode(index, root)? {
            Some(event) => decoded.push(event),
            None => warn!(index, kind = %persisted.kind, "skipping unsupported event kind"),
        }
    }
    Ok(decoded)
}

/// One document of a persisted frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedFile {
    /// Document path, relative to the workspace root when possible
    pub path: DocumentId,
    /// Full text
    pub text: String,
    /// View column
    pub column: u32,
    /// Logical clock of the last event that touched the document
    pub last_action_count: u64,
    /// Selections, when known
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selections: Vec<Selection>,
    /// Viewport, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_range: Option<Range>,
}

/// A recorded timeline as written to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedTimeline {
    /// Total recording length
    pub codio_length: RelativeMs,
    /// Frame at offset zero
    pub initial_frame: Vec<PersistedFile>,
    /// Ordered events
    pub events: Vec<PersistedEvent>,
    /// Every document touched during the recording
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub codio_editors: Vec<DocumentId>,
}

impl PersistedTimeline {
    /// Parse from JSON
    ///
    /// # Errors
    ///
    /// Returns error if the JSON does not describe a timeline
    pub fn from_json(json: &str) -> LogResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty JSON
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_json(&self) -> LogResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a timeline file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn read_from(path: &Path) -> LogResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Write a timeline file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn write_to(&self, path: &Path) -> LogResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Whether there is anything to replay
    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.events.is_empty() || !self.initial_frame.is_empty()
    }
}

/// Recording metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Recording length
    pub length: RelativeMs,
    /// Display name
    pub name: String,
    /// Format version the recording was written with
    pub version: Version,
    /// Wall-clock time the recording started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl Metadata {
    /// Parse metadata, rejecting format versions this build cannot read
    ///
    /// # Errors
    ///
    /// Returns error if the JSON is malformed or the version is incompatible
    pub fn from_json(json: &str) -> LogResult<Self> {
        let metadata: Metadata = serde_json::from_str(json)?;
        if !FORMAT_VERSION.reads(&metadata.version) {
            return Err(LogError::UnsupportedVersion {
                found: metadata.version,
                supported: FORMAT_VERSION,
            });
        }
        Ok(metadata)
    }

    /// Read a metadata file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed, or was written by
    /// an incompatible format version
    pub fn read_from(path: &Path) -> LogResult<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Write a metadata file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn write_to(&self, path: &Path) -> LogResult<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
