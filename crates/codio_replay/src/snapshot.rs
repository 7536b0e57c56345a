//! Conversion between frames and their persisted form.

use crate::frame::{Frame, FrameEntry};
use codio_log::PersistedFile;
use std::path::Path;
use tracing::warn;

/// Persist a frame, naming documents relative to `root` when they live under it
#[must_use]
pub fn serialize_frame(frame: &Frame, root: Option<&Path>) -> Vec<PersistedFile> {
    frame
        .iter()
        .map(|(id, entry)| PersistedFile {
            path: id.normalize(root),
            text: entry.text().to_string(),
            column: entry.view_column,
            last_action_count: entry.last_action_index,
            selections: entry.selections.clone(),
            visible_range: entry.visible_range,
        })
        .collect()
}

/// Rebuild a frame, resolving persisted paths against `root`.
///
/// A path listed twice keeps its first entry.
#[must_use]
pub fn deserialize_frame(files: &[PersistedFile], root: Option<&Path>) -> Frame {
    let mut frame = Frame::new();
    for file in files {
        let id = file.path.resolve(root);
        if frame.contains(&id) {
            warn!(document = %id, "duplicate document in persisted frame");
            continue;
        }
        let entry = FrameEntry::new(file.text.clone(), file.column, file.last_action_count)
            .with_selections(file.selections.clone())
            .with_visible_range(file.visible_range);
        frame.insert(id, entry);
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use codio_core::{DocumentId, Position, Range, Selection};

    fn root() -> &'static Path {
        Path::new("/work/project")
    }

    fn sample() -> Frame {
        let mut frame = Frame::new();
        frame.insert(
            DocumentId::new("/work/project/src/a.rs"),
            FrameEntry::new("fn a() {}\n", 1, 0)
                .with_selections(vec![Selection::cursor(Position::new(0, 3))])
                .with_visible_range(Some(Range::from_coords(0, 0, 40, 0))),
        );
        frame.insert(DocumentId::new("/tmp/scratch.rs"), FrameEntry::new("", 2, 3));
        frame
    }

    #[test]
    fn test_serialize_relativizes_paths() {
        let files = serialize_frame(&sample(), Some(root()));
        assert_eq!(files[0].path.as_str(), "src/a.rs");
        assert_eq!(files[1].path.as_str(), "/tmp/scratch.rs");
        assert_eq!(files[1].last_action_count, 3);
    }

    #[test]
    fn test_frame_survives_persistence() {
        let files = serialize_frame(&sample(), Some(root()));
        let back = deserialize_frame(&files, Some(root()));
        assert_eq!(back, sample());
    }

    #[test]
    fn test_duplicate_path_keeps_first() {
        let mut files = serialize_frame(&sample(), None);
        let mut dup = files[0].clone();
        dup.text = "other".to_string();
        files.push(dup);
        let frame = deserialize_frame(&files, None);
        assert_eq!(frame.len(), 2);
        assert_eq!(
            frame.text_of(&DocumentId::new("/work/project/src/a.rs")),
            Some("fn a() {}\n")
        );
    }
}
