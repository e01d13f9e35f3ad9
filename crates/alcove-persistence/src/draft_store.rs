//! Unsent-draft persistence.
//!
//! One small JSON file holding the text sitting in the input box, so an app
//! restart puts the user back where they were. Drafts are disposable;
//! a corrupt file reads as "no draft" instead of an error.

use std::collections::BTreeSet;

use alcove_core::error::{Result, StoreError};
use alcove_core::history::Draft;

use crate::paths::StorePaths;
use crate::storage::AtomicJsonFile;

pub struct DraftStore {
    file: AtomicJsonFile<Draft>,
}

impl DraftStore {
    pub fn new(paths: &StorePaths) -> Self {
        Self {
            file: AtomicJsonFile::new(paths.drafts_file()),
        }
    }

    /// Persists the current input-box state.
    pub fn save(&self, message: impl Into<String>, tags: BTreeSet<String>) -> Result<()> {
        let draft = Draft::new(message, tags);
        self.file
            .save(&draft)
            .map_err(|e| StoreError::persistence(self.file.path(), e))?;
        tracing::debug!("Draft saved ({} chars)", draft.message.len());
        Ok(())
    }

    /// Loads the stored draft, if one with any content exists.
    pub fn load(&self) -> Option<Draft> {
        match self.file.load() {
            Ok(Some(draft)) if !draft.is_empty() => Some(draft),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Failed to load draft, ignoring it: {}", e);
                None
            }
        }
    }

    /// Removes the stored draft.
    pub fn clear(&self) -> Result<()> {
        self.file
            .remove()
            .map_err(|e| StoreError::persistence(self.file.path(), e))?;
        tracing::debug!("Draft cleared");
        Ok(())
    }

    pub fn has_draft(&self) -> bool {
        self.load().is_some()
    }
}
