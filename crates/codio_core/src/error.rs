//! Core error types for codio.

use thiserror::Error;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Invalid encoding
    #[error("Invalid encoding: {reason}")]
    InvalidEncoding {
        /// What the decoder rejected
        reason: String,
    },

    /// I/O error (message only, errors stay `Clone`)
    #[error("I/O error: {message}")]
    Io {
        /// Error message
        message: String,
    },
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidEncoding {
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::InvalidEncoding {
            reason: "expected value".to_string(),
        };
        assert_eq!(format!("{}", err), "Invalid encoding: expected value");
    }

    #[test]
    fn test_json_error_converts() {
        let parse: Result<u64, _> = serde_json::from_str("not json");
        let err: CoreError = parse.unwrap_err().into();
        assert!(matches!(err, CoreError::InvalidEncoding { .. }));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: CoreError = io.into();
        assert_eq!(
            err,
            CoreError::Io {
                message: "gone".to_string()
            }
        );
    }
}
