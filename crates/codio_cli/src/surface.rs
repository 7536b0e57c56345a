//! In-memory surface that logs every call it receives.

use codio_core::{DocumentId, Range, Selection};
use codio_log::ContentChange;
use codio_replay::{DocumentSurface, MemorySurface, SurfaceResult};
use tracing::{debug, info};

/// Wraps a [`MemorySurface`] and traces each operation
#[derive(Debug, Default)]
pub struct LoggingSurface {
    inner: MemorySurface,
}

impl LoggingSurface {
    pub fn new(inner: MemorySurface) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &MemorySurface {
        &self.inner
    }
}

impl DocumentSurface for LoggingSurface {
    fn open_document(&mut self, document: &DocumentId, column: u32) -> SurfaceResult<()> {
        info!(%document, column, "open");
        self.inner.open_document(document, column)
    }

    fn close_document(&mut self, document: &DocumentId) -> SurfaceResult<()> {
        debug!(%document, "close");
        self.inner.close_document(document)
    }

    fn set_text(&mut self, document: &DocumentId, text: &str) -> SurfaceResult<()> {
        debug!(%document, bytes = text.len(), "set text");
        self.inner.set_text(document, text)
    }

    fn apply_changes(&mut self, document: &DocumentId, changes: &[ContentChange]) -> SurfaceResult<()> {
        for change in changes {
            info!(%document, range = %change.range, text = %change.text, "edit");
        }
        self.inner.apply_changes(document, changes)
    }

    fn set_selections(&mut self, document: &DocumentId, selections: &[Selection]) -> SurfaceResult<()> {
        if let Some(primary) = selections.first() {
            info!(%document, at = %primary.active, count = selections.len(), "select");
        }
        self.inner.set_selections(document, selections)
    }

    fn reveal_range(&mut self, document: &DocumentId, range: Range) -> SurfaceResult<()> {
        debug!(%document, %range, "reveal");
        self.inner.reveal_range(document, range)
    }

    fn clear_selection(&mut self) -> SurfaceResult<()> {
        debug!("clear selection");
        self.inner.clear_selection()
    }
}
