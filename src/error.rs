//! Centralized error types for unmht.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the unmht library.
///
/// Malformed archive content is never an error: the extractor recovers
/// from it and logs what it skipped.
#[derive(Error, Debug)]
pub enum UnmhtError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("Archive file not found: {0}")]
    FileNotFound(PathBuf),

    /// There was nothing to extract.
    #[error("Nothing to extract: the input is empty")]
    EmptyInput,

    /// Writing an extracted bundle failed.
    #[error("Export error: {0}")]
    ExportError(String),

    /// The bundle manifest could not be serialized.
    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
}

/// Convenience alias for `Result<T, UnmhtError>`.
pub type Result<T> = std::result::Result<T, UnmhtError>;

impl UnmhtError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (prefer `UnmhtError::io`).
impl From<std::io::Error> for UnmhtError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_keeps_path() {
        let err = UnmhtError::io(
            "/tmp/x.mht",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "I/O error on '/tmp/x.mht': denied");
    }

    #[test]
    fn test_bare_io_error_converts() {
        let err: UnmhtError = std::io::Error::other("boom").into();
        assert!(matches!(err, UnmhtError::Io { ref path, .. } if path.as_os_str() == "<unknown>"));
    }
}
