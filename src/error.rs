//! Error types for the photo organizer

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for photo organizer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the photo organizer
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Recovered by the date resolver, never surfaced from a run
    #[error("Failed to read metadata from {path}: {message}")]
    MetadataUnreadable { path: PathBuf, message: String },

    #[error("Failed to prepare destination directory {path}: {source}")]
    Planning {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to move {from} to {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("Error scanning directory {root}: {message}")]
    Scan { root: PathBuf, message: String },

    #[error("File has no usable name: {path}")]
    InvalidFileName { path: PathBuf },

    #[error("An organize run is already active")]
    AlreadyRunning,

    #[error("Organize worker terminated unexpectedly")]
    WorkerPanicked,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error aborts the whole run rather than a single file
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Scan { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_scan_errors_are_fatal() {
        let scan = Error::Scan {
            root: PathBuf::from("/photos"),
            message: "permission denied".into(),
        };
        let planning = Error::Planning {
            path: PathBuf::from("/photos/2024/01"),
            source: std::io::Error::other("read-only"),
        };
        assert!(scan.is_fatal());
        assert!(!planning.is_fatal());
        assert!(!Error::AlreadyRunning.is_fatal());
    }

    #[test]
    fn test_display_mentions_paths() {
        let err = Error::Move {
            from: PathBuf::from("a.jpg"),
            to: PathBuf::from("2024/01/a.jpg"),
            source: std::io::Error::other("cross-device link"),
        };
        let text = err.to_string();
        assert!(text.contains("a.jpg"));
        assert!(text.contains("2024/01/a.jpg"));
        assert!(text.contains("cross-device link"));
    }
}
