//! Recording format versions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Format version written into every saved recording
pub const FORMAT_VERSION: Version = Version::new(0, 1, 0);

/// Semantic version, persisted as a `"major.minor.patch"` string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    /// Major component
    pub major: u64,
    /// Minor component
    pub minor: u64,
    /// Patch component
    pub patch: u64,
}

impl Version {
    /// Create a new version
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse from string
    ///
    /// # Errors
    ///
    /// Returns error if format is invalid
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(VersionError::InvalidFormat(s.to_string()));
        }

        let component = |part: &str| {
            part.parse::<u64>()
                .map_err(|_| VersionError::InvalidComponent(part.to_string()))
        };

        Ok(Self {
            major: component(parts[0])?,
            minor: component(parts[1])?,
            patch: component(parts[2])?,
        })
    }

    /// Whether a recording written with `other` can be read by this version
    #[must_use]
    pub const fn reads(&self, other: &Version) -> bool {
        self.major == other.major && (self.major > 0 || self.minor == other.minor)
    }
}

impl Default for Version {
    fn default() -> Self {
        FORMAT_VERSION
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.to_string()
    }
}

/// Version-related errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// Invalid format
    #[error("Invalid version format: {0}")]
    InvalidFormat(String),
    /// Invalid component
    #[error("Invalid version component: {0}")]
    InvalidComponent(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parse() {
        let v = Version::parse("1.2.3").unwrap();
        assert_eq!(v, Version::new(1, 2, 3));
    }

    #[test]
    fn test_version_display() {
        assert_eq!(format!("{}", FORMAT_VERSION), "0.1.0");
    }

    #[test]
    fn test_version_serializes_as_string() {
        let json = serde_json::to_string(&Version::new(0, 1, 0)).unwrap();
        assert_eq!(json, "\"0.1.0\"");
        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, FORMAT_VERSION);
    }

    #[test]
    fn test_version_parse_error() {
        let result = Version::parse("1.2");
        assert!(matches!(result, Err(VersionError::InvalidFormat(_))));

        let result = Version::parse("a.b.c");
        assert!(matches!(result, Err(VersionError::InvalidComponent(_))));
    }

    #[test]
    fn test_reads_compatibility() {
        assert!(FORMAT_VERSION.reads(&Version::new(0, 1, 7)));
        assert!(!FORMAT_VERSION.reads(&Version::new(0, 2, 0)));
        assert!(Version::new(1, 4, 0).reads(&Version::new(1, 0, 0)));
    }
}
