//! Document identifiers.
//!
//! A document is named by a normalized path string, never by a live editor
//! handle, so a recorded log stays portable across processes and machines.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Opaque, stable document identifier (a normalized path with `/` separators)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    /// Create from any path-like string; separators are normalized to `/`
    #[must_use]
    pub fn new(path: impl AsRef<str>) -> Self {
        Self(path.as_ref().replace('\\', "/"))
    }

    /// Create from a filesystem path
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        Self::new(path.to_string_lossy())
    }

    /// Get as string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id names an absolute path
    #[must_use]
    pub fn is_absolute(&self) -> bool {
        self.0.starts_with('/') || Path::new(&self.0).is_absolute() || has_drive_prefix(&self.0)
    }

    /// Rewrite relative to `root` when the document lives under it.
    ///
    /// Documents outside `root` (or when no root is given) keep their
    /// absolute id.
    #[must_use]
    pub fn normalize(&self, root: Option<&Path>) -> DocumentId {
        let Some(root) = root else {
            return self.clone();
        };
        match Path::new(&self.0).strip_prefix(root) {
            Ok(relative) if !relative.as_os_str().is_empty() => {
                let joined: Vec<String> = relative
                    .components()
                    .filter_map(|c| match c {
                        Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                        _ => None,
                    })
                    .collect();
                DocumentId(joined.join("/"))
            }
            _ => self.clone(),
        }
    }

    /// Inverse of [`DocumentId::normalize`]: join a relative id onto `root`
    #[must_use]
    pub fn resolve(&self, root: Option<&Path>) -> DocumentId {
        match root {
            Some(root) if !self.is_absolute() => {
                let mut path = PathBuf::from(root);
                for part in self.0.split('/').filter(|p| !p.is_empty()) {
                    path.push(part);
                }
                DocumentId::from_path(&path)
            }
            _ => self.clone(),
        }
    }
}

fn has_drive_prefix(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<DocumentId> for String {
    fn from(value: DocumentId) -> Self {
        value.0
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_normalizes_separators() {
        let id: DocumentId = serde_json::from_str(r#""src\\win\\a.rs""#).unwrap();
        assert_eq!(id.as_str(), "src/win/a.rs");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""src/win/a.rs""#);
    }

    #[test]
    fn test_normalize_under_root() {
        let id = DocumentId::new("/home/ada/project/src/main.rs");
        let rel = id.normalize(Some(Path::new("/home/ada/project")));
        assert_eq!(rel.as_str(), "src/main.rs");
        assert!(!rel.is_absolute());
    }

    #[test]
    fn test_normalize_outside_root_stays_absolute() {
        let id = DocumentId::new("/etc/hosts");
        let rel = id.normalize(Some(Path::new("/home/ada/project")));
        assert_eq!(rel, id);
    }

    #[test]
    fn test_normalize_without_root() {
        let id = DocumentId::new("/tmp/a.txt");
        assert_eq!(id.normalize(None), id);
    }

    #[test]
    fn test_resolve_roundtrip() {
        let root = Path::new("/work/space");
        let id = DocumentId::new("/work/space/lib/a.ts");
        let rel = id.normalize(Some(root));
        assert_eq!(rel.resolve(Some(root)), id);
    }

    #[test]
    fn test_resolve_keeps_absolute() {
        let id = DocumentId::new("/abs/file.rs");
        assert_eq!(id.resolve(Some(Path::new("/other"))), id);
    }

    #[test]
    fn test_backslashes_normalized() {
        let id = DocumentId::new("src\\lib.rs");
        assert_eq!(id.as_str(), "src/lib.rs");
        assert!(DocumentId::new("C:/x/y").is_absolute());
    }
}
