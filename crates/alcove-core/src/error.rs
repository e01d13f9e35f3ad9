//! Error types for the Alcove persistence layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the Alcove persistence layer.
///
/// Variants are typed and carry plain string detail so errors can cross the
/// desktop IPC boundary (`Clone + Serialize + Deserialize`).
///
/// Two recoverable conditions deliberately have no variant here: missing
/// configuration keys are healed in place during validation, and a failed
/// backup recovery falls back to the compiled-in defaults. Both surface
/// through [`crate::config::LoadOutcome`] instead of an error.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum StoreError {
    /// The configuration document is not a JSON object and cannot be healed.
    #[error("configuration document is not a JSON object: {detail}")]
    ConfigCorrupt { detail: String },

    /// A storage operation on `path` failed. After a failed write the
    /// in-memory and on-disk state have diverged, so this is always
    /// surfaced to the caller.
    #[error("storage failure for '{path}': {message}")]
    Persistence { path: String, message: String },

    /// Entity not found (e.g. an archive segment requested by name).
    #[error("{entity} not found: '{name}'")]
    NotFound { entity: String, name: String },

    /// IO error (file system operations outside the flush path).
    #[error("IO error: {message}")]
    Io { message: String },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {message}")]
    Json { message: String },
}

impl StoreError {
    /// Creates a ConfigCorrupt error.
    pub fn corrupt(detail: impl Into<String>) -> Self {
        Self::ConfigCorrupt {
            detail: detail.into(),
        }
    }

    /// Creates a Persistence error for a failed write to `path`.
    pub fn persistence(path: impl AsRef<std::path::Path>, message: impl ToString) -> Self {
        Self::Persistence {
            path: path.as_ref().display().to_string(),
            message: message.to_string(),
        }
    }

    /// Creates a NotFound error.
    pub fn not_found(entity: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            name: name.into(),
        }
    }

    /// Creates an IO error.
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Check if this is a ConfigCorrupt error.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::ConfigCorrupt { .. })
    }

    /// Check if this is a Persistence error.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence { .. })
    }

    /// Check if this is a NotFound error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json {
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, StoreError>`.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_display_includes_path() {
        let err = StoreError::persistence("/tmp/config.json", "disk full");
        assert!(err.to_string().contains("/tmp/config.json"));
        assert!(err.to_string().contains("disk full"));
        assert!(err.is_persistence());
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: StoreError = io.into();
        assert!(matches!(err, StoreError::Io { .. }));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_not_found_predicate() {
        let err = StoreError::not_found("archive", "chat-20240101-000000.json");
        assert!(err.is_not_found());
        assert!(!err.is_corrupt());
    }

    #[test]
    fn test_roundtrip_serialization() {
        let err = StoreError::corrupt("document was an array");
        let json = serde_json::to_string(&err).unwrap();
        let back: StoreError = serde_json::from_str(&json).unwrap();
        assert!(back.is_corrupt());
    }

    #[test]
    fn test_deserializes_from_an_owned_buffer() {
        // Buffers read off an IPC channel are owned and short-lived; every
        // variant must decode without borrowing from them.
        let err = StoreError::not_found("archive segment", "chat-20240101-000000.json");
        let json = serde_json::to_string(&err).unwrap();
        let back: StoreError = serde_json::from_str(&json).unwrap();
        drop(json);
        assert!(back.is_not_found());
        assert_eq!(back.to_string(), err.to_string());
    }
}
