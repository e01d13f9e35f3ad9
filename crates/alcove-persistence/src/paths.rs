//! Unified path management for alcove storage files.
//!
//! Every store takes a [`StorePaths`] instance instead of resolving locations
//! on its own, so tests can point a store at a scratch directory and two
//! stores handed the same instance agree on the layout.

use std::path::{Path, PathBuf};

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Platform data directory could not be determined.
    DataDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::DataDirNotFound => write!(f, "Cannot find platform data directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Resolves every file the persistence layer touches from one base directory.
///
/// # Directory Structure
///
/// ```text
/// <base>/
/// ├── config/
/// │   ├── config.json          # Primary configuration document
/// │   └── config.json.backup   # Pre-write snapshot of the above
/// └── data/
///     ├── chat_history.json    # Live history log
///     ├── drafts.json          # Unsent per-session drafts
///     ├── archives/            # Immutable history segments
///     │   └── chat-YYYYMMDD-HHMMSS.json
///     └── exports/             # Default destination for history exports
/// ```
#[derive(Debug, Clone)]
pub struct StorePaths {
    base: PathBuf,
}

impl StorePaths {
    /// Creates a path set rooted at `base`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Creates a path set rooted at the platform data directory
    /// (e.g. `~/.local/share/alcove/`).
    pub fn default_location() -> Result<Self, PathError> {
        dirs::data_dir()
            .map(|dir| Self::new(dir.join("alcove")))
            .ok_or(PathError::DataDirNotFound)
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn config_dir(&self) -> PathBuf {
        self.base.join("config")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.base.join("data")
    }

    /// Path to the primary configuration document.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir().join("config.json")
    }

    /// Path to the pre-write configuration snapshot.
    pub fn backup_file(&self) -> PathBuf {
        self.config_dir().join("config.json.backup")
    }

    /// Path to the live history log.
    pub fn history_file(&self) -> PathBuf {
        self.data_dir().join("chat_history.json")
    }

    /// Directory holding immutable history archive segments.
    pub fn archives_dir(&self) -> PathBuf {
        self.data_dir().join("archives")
    }

    /// Path to the per-session draft file.
    pub fn drafts_file(&self) -> PathBuf {
        self.data_dir().join("drafts.json")
    }

    /// Default destination directory for history exports.
    pub fn exports_dir(&self) -> PathBuf {
        self.data_dir().join("exports")
    }
}
