//! Recorder: turns host notifications into a time-stamped event log.
//!
//! The log never names a document the replay cannot know about. A document
//! enters the recording either through the initial frame or through a
//! `DocumentSwitch` marked `is_initial`; notifications for any other document
//! are dropped.

use crate::host::{Channel, EditorHost, EditorSnapshot, Notification, RecordResult};
use codio_core::{Clock, DocumentId, EpochMs, Range, RelativeMs, Selection};
use codio_log::{
    ContentChange, DocumentSwitch, Event, PersistedEvent, PersistedFile, PersistedTimeline,
    create_relative_timeline, encode_events,
};
use codio_replay::{Frame, FrameEntry, serialize_frame};
use indexmap::IndexSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Portable output of a recording
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineContent {
    /// Events with offsets relative to the recording start
    pub events: Vec<PersistedEvent>,
    /// Frame at offset zero
    pub initial_frame: Vec<PersistedFile>,
    /// Every document the recording knows, in first-seen order
    pub documents: Vec<DocumentId>,
}

impl TimelineContent {
    /// Persisted timeline of the given length
    #[must_use]
    pub fn into_persisted(self, length: RelativeMs) -> PersistedTimeline {
        PersistedTimeline {
            codio_length: length,
            initial_frame: self.initial_frame,
            events: self.events,
            codio_editors: self.documents,
        }
    }
}

/// Collects editor events while subscribed to a host.
///
/// Events are stamped with active time: capture time minus every pause
/// taken so far, so a recording's offsets never count paused time.
pub struct Recorder {
    initial_frame: Frame,
    known_documents: IndexSet<DocumentId>,
    events: Vec<Event<EpochMs>>,
    subscriptions: IndexSet<Channel>,
    started: bool,
    paused_at: Option<EpochMs>,
    paused_total: RelativeMs,
    clock: Arc<dyn Clock>,
}

impl Recorder {
    /// Create an idle recorder
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            initial_frame: Frame::new(),
            known_documents: IndexSet::new(),
            events: Vec::new(),
            subscriptions: IndexSet::new(),
            started: false,
            paused_at: None,
            paused_total: RelativeMs::zero(),
            clock,
        }
    }

    /// Snapshot the active editor and subscribe to every channel.
    ///
    /// Starting a running recorder does nothing.
    ///
    /// # Errors
    ///
    /// Returns error if the host refuses a channel; no channel stays subscribed
    pub fn start_recording(&mut self, host: &mut dyn EditorHost) -> RecordResult<()> {
        if self.started {
            return Ok(());
        }
        self.subscribe_all(host)?;
        if let Some(editor) = host.active_editor() {
            self.add_to_initial_frame(editor);
        }
        self.started = true;
        info!(documents = self.initial_frame.len(), "recording started");
        Ok(())
    }

    /// Unsubscribe from every channel
    pub fn stop_recording(&mut self, host: &mut dyn EditorHost) {
        self.unsubscribe_all(host);
        self.paused_total = self.paused_time();
        self.paused_at = None;
        if self.started {
            info!(events = self.events.len(), documents = self.known_documents.len(), "recording stopped");
        }
        self.started = false;
    }

    /// Detach from the host, keeping everything recorded so far
    pub fn pause(&mut self, host: &mut dyn EditorHost) {
        if !self.started || self.paused_at.is_some() {
            return;
        }
        self.unsubscribe_all(host);
        self.paused_at = Some(self.clock.now());
    }

    /// Attach to the host again after [`Recorder::pause`]
    ///
    /// # Errors
    ///
    /// Returns error if the host refuses a channel
    pub fn resume(&mut self, host: &mut dyn EditorHost) -> RecordResult<()> {
        let Some(paused_at) = self.paused_at else {
            return Ok(());
        };
        self.subscribe_all(host)?;
        self.paused_at = None;
        self.paused_total = self.paused_total.saturating_add(self.clock.now().since(paused_at));
        debug!(paused = %self.paused_total, "recording resumed");
        Ok(())
    }

    /// Handle one host notification
    pub fn notify(&mut self, notification: Notification) {
        let channel = notification.channel();
        if !self.subscriptions.contains(&channel) {
            debug!(%channel, "notification on unsubscribed channel ignored");
            return;
        }

        match notification {
            Notification::ActiveEditorChanged(Some(editor)) => self.on_active_editor(editor),
            Notification::ActiveEditorChanged(None) => {}
            Notification::TextChanged { document, changes } => self.on_text(document, changes),
            Notification::SelectionChanged {
                document,
                selections,
            } => self.on_selection(document, selections),
            Notification::VisibleRangeChanged {
                document,
                visible_range,
            } => self.on_visible_range(document, visible_range),
        }
    }

    /// Rebase the log onto `origin` and name documents relative to `root`
    ///
    /// # Errors
    ///
    /// Returns error if an event cannot be encoded
    pub fn timeline_content(&self, origin: EpochMs, root: Option<&Path>) -> RecordResult<TimelineContent> {
        let relative = create_relative_timeline(&self.events, origin);
        Ok(TimelineContent {
            events: encode_events(&relative, root)?,
            initial_frame: serialize_frame(&self.initial_frame, root),
            documents: self
                .known_documents
                .iter()
                .map(|id| id.normalize(root))
                .collect(),
        })
    }

    /// Frame at the start of the recording
    #[must_use]
    pub fn initial_frame(&self) -> &Frame {
        &self.initial_frame
    }

    /// Events recorded so far, stamped with active time
    #[must_use]
    pub fn events(&self) -> &[Event<EpochMs>] {
        &self.events
    }

    /// Documents known to the recording, in first-seen order
    pub fn known_documents(&self) -> impl Iterator<Item = &DocumentId> {
        self.known_documents.iter()
    }

    /// Whether the recorder was started and not stopped
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.started
    }

    /// Whether the recorder is started but detached from the host
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    /// Time spent paused, including a pause still in progress
    #[must_use]
    pub fn paused_time(&self) -> RelativeMs {
        match self.paused_at {
            Some(paused_at) => self.paused_total.saturating_add(self.clock.now().since(paused_at)),
            None => self.paused_total,
        }
    }

    fn stamp(&self) -> EpochMs {
        EpochMs(self.clock.now().0.saturating_sub(self.paused_total.0))
    }

    fn subscribe_all(&mut self, host: &mut dyn EditorHost) -> RecordResult<()> {
        for channel in Channel::ALL {
            if let Err(err) = host.subscribe(channel) {
                self.unsubscribe_all(host);
                return Err(err);
            }
            self.subscriptions.insert(channel);
        }
        Ok(())
    }

    fn unsubscribe_all(&mut self, host: &mut dyn EditorHost) {
        for channel in self.subscriptions.drain(..) {
            host.unsubscribe(channel);
        }
    }

    fn add_to_initial_frame(&mut self, editor: EditorSnapshot) {
        let entry = FrameEntry::new(editor.content, editor.view_column, 0)
            .with_selections(editor.selections)
            .with_visible_range(editor.visible_range);
        self.known_documents.insert(editor.document.clone());
        self.initial_frame.insert(editor.document, entry);
    }

    /// A document first seen mid-recording existed before it was observed,
    /// so the initial frame carries it too, one action in.
    fn backfill_initial_frame(&mut self, editor: &EditorSnapshot) {
        if self.initial_frame.contains(&editor.document) {
            return;
        }
        let entry = FrameEntry::new(editor.content.clone(), editor.view_column, 1)
            .with_selections(editor.selections.clone())
            .with_visible_range(editor.visible_range);
        self.initial_frame.insert(editor.document.clone(), entry);
    }

    fn on_active_editor(&mut self, editor: EditorSnapshot) {
        if self.known_documents.is_empty() {
            debug!(document = %editor.document, "first active editor joins initial frame");
            self.add_to_initial_frame(editor);
            return;
        }

        let is_initial = self.known_documents.insert(editor.document.clone());
        if is_initial {
            self.backfill_initial_frame(&editor);
        }
        let switch = DocumentSwitch {
            is_initial,
            content: editor.content,
            view_column: editor.view_column,
            visible_range: editor.visible_range,
            selections: editor.selections,
        };
        self.push(Event::switch(editor.document, self.stamp(), switch));
    }

    fn on_text(&mut self, document: DocumentId, changes: Vec<ContentChange>) {
        if changes.is_empty() || !self.is_known(&document) {
            return;
        }
        self.push(Event::text(document, self.stamp(), changes));
    }

    fn on_selection(&mut self, document: DocumentId, selections: Vec<Selection>) {
        if selections.is_empty() || !self.is_known(&document) {
            return;
        }
        self.push(Event::selection(document, self.stamp(), selections));
    }

    fn on_visible_range(&mut self, document: DocumentId, visible_range: Option<Range>) {
        let Some(visible_range) = visible_range else {
            return;
        };
        if !self.is_known(&document) {
            return;
        }
        self.push(Event::visible_range(document, self.stamp(), visible_range));
    }

    fn is_known(&self, document: &DocumentId) -> bool {
        let known = self.known_documents.contains(document);
        if !known {
            debug!(%document, "notification for unknown document skipped");
        }
        known
    }

    fn push(&mut self, event: Event<EpochMs>) {
        debug!(document = %event.document, kind = %event.kind(), at = %event.time, "recorded");
        self.events.push(event);
    }
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("documents", &self.known_documents.len())
            .field("events", &self.events.len())
            .field("subscriptions", &self.subscriptions)
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use codio_core::{ManualClock, Position};
    use codio_log::{EventKind, EventPayload, decode_events};
    use codio_replay::{create_frame, deserialize_frame};

    fn doc(path: &str) -> DocumentId {
        DocumentId::new(path)
    }

    fn setup(start: u64) -> (Arc<ManualClock>, Recorder) {
        let clock = Arc::new(ManualClock::new(EpochMs(start)));
        let recorder = Recorder::new(clock.clone());
        (clock, recorder)
    }

    fn typed(document: &str, text: &str) -> Notification {
        Notification::TextChanged {
            document: doc(document),
            changes: vec![ContentChange::new(Range::caret(Position::new(0, 0)), text)],
        }
    }

    #[test]
    fn test_start_snapshots_active_editor() {
        let (_, mut recorder) = setup(0);
        let mut host = MemoryHost::with_active(EditorSnapshot::new(doc("/w/a.rs"), "fn a() {}"));
        recorder.start_recording(&mut host).unwrap();

        assert!(recorder.is_recording());
        assert_eq!(recorder.initial_frame().text_of(&doc("/w/a.rs")), Some("fn a() {}"));
        assert_eq!(recorder.initial_frame().get(&doc("/w/a.rs")).unwrap().last_action_index, 0);
        for channel in Channel::ALL {
            assert!(host.is_subscribed(channel));
        }
    }

    #[test]
    fn test_start_twice_is_noop() {
        let (_, mut recorder) = setup(0);
        let mut host = MemoryHost::with_active(EditorSnapshot::new(doc("a.rs"), ""));
        recorder.start_recording(&mut host).unwrap();
        host.set_active(Some(EditorSnapshot::new(doc("b.rs"), "")));
        recorder.start_recording(&mut host).unwrap();
        assert_eq!(recorder.initial_frame().len(), 1);
    }

    #[test]
    fn test_refused_channel_leaves_nothing_subscribed() {
        let (_, mut recorder) = setup(0);
        let mut host = MemoryHost::new();
        host.refuse(Channel::VisibleRange);
        assert!(recorder.start_recording(&mut host).is_err());
        assert_eq!(host.subscriptions().count(), 0);
        assert!(!recorder.is_recording());
    }

    #[test]
    fn test_lazy_initial_frame() {
        let (clock, mut recorder) = setup(1_000);
        let mut host = MemoryHost::new();
        recorder.start_recording(&mut host).unwrap();
        assert!(recorder.initial_frame().is_empty());

        clock.advance(200);
        recorder.notify(Notification::ActiveEditorChanged(Some(EditorSnapshot::new(doc("a.rs"), "x"))));
        assert_eq!(recorder.initial_frame().text_of(&doc("a.rs")), Some("x"));
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn test_new_and_known_document_switches() {
        let (clock, mut recorder) = setup(0);
        let mut host = MemoryHost::with_active(EditorSnapshot::new(doc("a.rs"), ""));
        recorder.start_recording(&mut host).unwrap();

        clock.advance(100);
        let mut b = EditorSnapshot::new(doc("b.rs"), "mod b;");
        b.view_column = 2;
        recorder.notify(Notification::ActiveEditorChanged(Some(b)));
        clock.advance(100);
        recorder.notify(Notification::ActiveEditorChanged(Some(EditorSnapshot::new(doc("a.rs"), ""))));

        let events = recorder.events();
        assert_eq!(events.len(), 2);
        match &events[0].payload {
            EventPayload::DocumentSwitch(switch) => {
                assert!(switch.is_initial);
                assert_eq!(switch.content, "mod b;");
                assert_eq!(switch.view_column, 2);
            }
            other => panic!("unexpected payload {other:?}"),
        }
        assert!(matches!(&events[1].payload, EventPayload::DocumentSwitch(s) if !s.is_initial));
        assert_eq!(events[1].time, EpochMs(200));
        let backfilled = recorder.initial_frame().get(&doc("b.rs")).unwrap();
        assert_eq!(backfilled.text(), "mod b;");
        assert_eq!(backfilled.last_action_index, 1);
    }

    #[test]
    fn test_unknown_and_empty_notifications_skipped() {
        let (_, mut recorder) = setup(0);
        let mut host = MemoryHost::with_active(EditorSnapshot::new(doc("a.rs"), ""));
        recorder.start_recording(&mut host).unwrap();

        recorder.notify(typed("elsewhere.rs", "x"));
        recorder.notify(Notification::TextChanged {
            document: doc("a.rs"),
            changes: Vec::new(),
        });
        recorder.notify(Notification::SelectionChanged {
            document: doc("a.rs"),
            selections: Vec::new(),
        });
        recorder.notify(Notification::VisibleRangeChanged {
            document: doc("a.rs"),
            visible_range: None,
        });
        recorder.notify(Notification::ActiveEditorChanged(None));
        assert!(recorder.events().is_empty());

        recorder.notify(typed("a.rs", "x"));
        assert_eq!(recorder.events().len(), 1);
    }

    #[test]
    fn test_pause_ignores_notifications() {
        let (_, mut recorder) = setup(0);
        let mut host = MemoryHost::with_active(EditorSnapshot::new(doc("a.rs"), ""));
        recorder.start_recording(&mut host).unwrap();

        recorder.pause(&mut host);
        assert!(recorder.is_paused());
        assert!(!host.is_subscribed(Channel::TextChange));
        recorder.notify(typed("a.rs", "lost"));
        assert!(recorder.events().is_empty());

        recorder.resume(&mut host).unwrap();
        recorder.notify(typed("a.rs", "kept"));
        assert_eq!(recorder.events().len(), 1);
    }

    #[test]
    fn test_stamps_exclude_paused_time() {
        let (clock, mut recorder) = setup(1_000);
        let mut host = MemoryHost::with_active(EditorSnapshot::new(doc("a.rs"), ""));
        recorder.start_recording(&mut host).unwrap();

        clock.advance(100);
        recorder.notify(typed("a.rs", "a"));
        recorder.pause(&mut host);
        clock.advance(3_000);
        assert_eq!(recorder.paused_time(), RelativeMs(3_000));
        recorder.resume(&mut host).unwrap();
        clock.advance(50);
        recorder.notify(typed("a.rs", "b"));

        let times: Vec<_> = recorder.events().iter().map(|e| e.time).collect();
        assert_eq!(times, vec![EpochMs(1_100), EpochMs(1_150)]);
        assert!(!recorder.is_paused());
    }

    #[test]
    fn test_stop_unsubscribes_and_is_idempotent() {
        let (_, mut recorder) = setup(0);
        let mut host = MemoryHost::new();
        recorder.start_recording(&mut host).unwrap();
        recorder.stop_recording(&mut host);
        recorder.stop_recording(&mut host);
        assert_eq!(host.subscriptions().count(), 0);
        assert!(!recorder.is_recording());

        recorder.notify(typed("a.rs", "x"));
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn test_timeline_content_rebases_and_relativizes() {
        let root = Path::new("/w");
        let (clock, mut recorder) = setup(10_000);
        let mut host = MemoryHost::with_active(EditorSnapshot::new(doc("/w/src/a.rs"), ""));
        recorder.start_recording(&mut host).unwrap();

        clock.advance(100);
        recorder.notify(typed("/w/src/a.rs", "early"));
        clock.advance(400);
        recorder.notify(typed("/w/src/a.rs", "hello "));
        clock.advance(400);
        recorder.notify(Notification::ActiveEditorChanged(Some(EditorSnapshot::new(doc("/tmp/b.rs"), "b"))));

        let content = recorder.timeline_content(EpochMs(10_300), Some(root)).unwrap();
        let times: Vec<_> = content.events.iter().map(|e| e.time).collect();
        assert_eq!(
            times,
            vec![Some(RelativeMs(0)), Some(RelativeMs(200)), Some(RelativeMs(600))]
        );
        assert_eq!(content.initial_frame[0].path.as_str(), "src/a.rs");
        assert_eq!(content.documents, vec![doc("src/a.rs"), doc("/tmp/b.rs")]);

        let events = decode_events(&content.events, Some(root)).unwrap();
        assert_eq!(events[2].kind(), EventKind::Editor);
        let frame = create_frame(&deserialize_frame(&content.initial_frame, Some(root)), &events);
        assert_eq!(frame.text_of(&doc("/w/src/a.rs")), Some("hello early"));
        assert_eq!(frame.text_of(&doc("/tmp/b.rs")), Some("b"));
    }
}
