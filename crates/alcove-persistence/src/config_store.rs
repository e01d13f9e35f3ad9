//! Configuration store.
//!
//! Owns the configuration document for one application instance, coalesces
//! bursts of changes into debounced writes, and keeps a backup snapshot so a
//! crash mid-write never costs the whole document.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use alcove_core::config::{
    self, AppearanceSettings, BackupSettings, ConfigDocument, DEFAULT_MODEL_PATH, DEFAULT_PROMPT,
    DEFAULT_THEME, DatabaseSettings, GenerationSettings, HistorySettings, LoadOutcome,
    PluginSettings, Preset, TrainingSettings, UpdaterSettings,
};
use alcove_core::error::{Result, StoreError};
use serde::de::DeserializeOwned;
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::debounce::Debouncer;
use crate::paths::StorePaths;
use crate::storage::AtomicJsonFile;

/// Quiet window between the last change and the write it triggers.
pub const WRITE_DEBOUNCE: Duration = Duration::from_millis(500);

/// Persistent configuration document with debounced writes.
///
/// Opening never fails: a corrupt primary file falls back to the backup, and
/// a corrupt backup falls back to the compiled-in defaults, with the taken
/// path reported as a [`LoadOutcome`]. Every mutation marks the document
/// dirty; the write happens synchronously on [`ConfigStore::save`] with
/// `immediate = true`, otherwise once the debounce deadline passes.
pub struct ConfigStore {
    paths: StorePaths,
    file: AtomicJsonFile<JsonValue>,
    document: ConfigDocument,
    debouncer: Debouncer,
    /// Merged-section read cache, cleared on every write path.
    section_cache: RwLock<HashMap<String, JsonValue>>,
}

impl ConfigStore {
    /// Opens the store, loading (and if necessary repairing) the document.
    pub fn open(paths: StorePaths) -> (Self, LoadOutcome) {
        Self::open_with_debounce(paths, WRITE_DEBOUNCE)
    }

    /// Opens the store with an explicit debounce window.
    pub fn open_with_debounce(paths: StorePaths, window: Duration) -> (Self, LoadOutcome) {
        let file = AtomicJsonFile::new(paths.config_file());
        let mut store = Self {
            file,
            document: ConfigDocument::compiled_default(),
            debouncer: Debouncer::new(window),
            section_cache: RwLock::new(HashMap::new()),
            paths,
        };
        let outcome = store.load();
        (store, outcome)
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    /// Discards in-memory state, including any unflushed changes, and
    /// re-reads the document from disk. Used when an external actor may have
    /// replaced the file behind the store's back.
    pub fn reload(&mut self) -> LoadOutcome {
        tracing::debug!("Reloading configuration from {:?}", self.file.path());
        self.load()
    }

    /// Loads the document, trying primary, then backup, then defaults.
    /// Every branch ends in a valid in-memory document.
    fn load(&mut self) -> LoadOutcome {
        self.debouncer.reset();
        self.section_cache.write().unwrap().clear();

        let (document, outcome, needs_persist) = match self.file.load() {
            Ok(Some(value)) => match ConfigDocument::from_value(value) {
                Ok((document, healed)) => {
                    if healed.is_empty() {
                        tracing::debug!("Configuration loaded from {:?}", self.file.path());
                    } else {
                        tracing::warn!(
                            "Configuration was missing or had malformed sections, healed: {:?}",
                            healed
                        );
                    }
                    let diverged = !healed.is_empty();
                    (document, LoadOutcome::Loaded, diverged)
                }
                Err(e) => {
                    tracing::error!("Configuration document is corrupt: {}", e);
                    self.recover_or_default()
                }
            },
            Ok(None) => {
                tracing::info!(
                    "No configuration file at {:?}, creating defaults",
                    self.file.path()
                );
                (
                    ConfigDocument::compiled_default(),
                    LoadOutcome::FellBackToDefaults,
                    true,
                )
            }
            Err(e) => {
                tracing::error!("Failed to read configuration: {}", e);
                self.recover_or_default()
            }
        };

        self.document = document;
        if needs_persist {
            // Self-healing write. Failure is logged, not propagated; the
            // in-memory document is valid either way and the next flush
            // retries the write.
            if let Err(e) = self.write_primary() {
                tracing::warn!("Failed to persist repaired configuration: {}", e);
            }
        }
        outcome
    }

    fn recover_or_default(&self) -> (ConfigDocument, LoadOutcome, bool) {
        match self.recover_from_backup() {
            Ok(document) => {
                tracing::info!("Configuration recovered from backup");
                (document, LoadOutcome::Recovered, true)
            }
            Err(e) => {
                tracing::warn!("Backup recovery failed ({}), falling back to defaults", e);
                (
                    ConfigDocument::compiled_default(),
                    LoadOutcome::FellBackToDefaults,
                    true,
                )
            }
        }
    }

    /// Reads and validates the backup document. The caller writes it back as
    /// the new primary; the backup file itself stays untouched so a failed
    /// write-back cannot destroy the last good copy.
    fn recover_from_backup(&self) -> Result<ConfigDocument> {
        let backup_path = self.paths.backup_file();
        let backup = AtomicJsonFile::<JsonValue>::new(backup_path.clone());
        let value = backup
            .load()
            .map_err(|e| StoreError::persistence(&backup_path, e))?
            .ok_or_else(|| {
                StoreError::persistence(&backup_path, "backup file missing or empty")
            })?;
        let (document, healed) = ConfigDocument::from_value(value)?;
        if !healed.is_empty() {
            tracing::warn!("Backup document healed sections: {:?}", healed);
        }
        Ok(document)
    }

    fn write_primary(&self) -> Result<()> {
        self.file
            .save(&self.document.to_value())
            .map_err(|e| StoreError::persistence(self.file.path(), e))
    }

    // ---- section reads ----------------------------------------------------

    /// Returns a section merged over its compiled-in defaults. Free-form keys
    /// (no compiled default) come back as stored, or `null` when absent.
    pub fn get_section(&self, name: &str) -> JsonValue {
        {
            let cache = self.section_cache.read().unwrap();
            if let Some(value) = cache.get(name) {
                return value.clone();
            }
        }

        let merged = self.document.merged_section(name);
        self.section_cache
            .write()
            .unwrap()
            .insert(name.to_string(), merged.clone());
        merged
    }

    /// Decodes a section into its typed model, falling back to the default
    /// instance when the stored value does not fit the schema.
    fn typed<T: DeserializeOwned + Default>(&self, name: &str) -> T {
        match self.document.typed_section(name) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Failed to decode '{}' section, using defaults: {}", name, e);
                T::default()
            }
        }
    }

    pub fn generation_settings(&self) -> GenerationSettings {
        self.typed(config::GENERATION)
    }

    pub fn history_settings(&self) -> HistorySettings {
        self.typed(config::HISTORY)
    }

    pub fn training_settings(&self) -> TrainingSettings {
        self.typed(config::TRAINING)
    }

    pub fn appearance_settings(&self) -> AppearanceSettings {
        self.typed(config::APPEARANCE)
    }

    pub fn backup_settings(&self) -> BackupSettings {
        self.typed(config::BACKUP)
    }

    pub fn plugin_settings(&self) -> PluginSettings {
        self.typed(config::PLUGINS)
    }

    pub fn updater_settings(&self) -> UpdaterSettings {
        self.typed(config::UPDATER)
    }

    pub fn database_settings(&self) -> DatabaseSettings {
        self.typed(config::DATABASE)
    }

    /// Model weights location. An empty stored value counts as unset.
    pub fn model_path(&self) -> String {
        match self.get_section(config::MODEL_PATH) {
            JsonValue::String(s) if !s.is_empty() => s,
            _ => DEFAULT_MODEL_PATH.to_string(),
        }
    }

    pub fn theme(&self) -> String {
        match self.get_section(config::THEME) {
            JsonValue::String(s) => s,
            _ => DEFAULT_THEME.to_string(),
        }
    }

    pub fn prompt(&self) -> String {
        match self.get_section(config::PROMPT) {
            JsonValue::String(s) => s,
            _ => DEFAULT_PROMPT.to_string(),
        }
    }

    /// Id of the signed-in user, `None` when nobody is.
    pub fn current_user_id(&self) -> Option<i64> {
        self.get_section(config::CURRENT_USER_ID).as_i64()
    }

    pub fn presets(&self) -> BTreeMap<String, Preset> {
        self.typed(config::PRESETS)
    }

    // ---- mutations ---------------------------------------------------------

    /// Shallow-merges `partial` into a top-level section and schedules a
    /// debounced write. Keys absent from `partial` keep their stored values;
    /// a non-object `partial` replaces the section wholesale.
    pub fn update_section(&mut self, name: &str, partial: JsonValue) {
        self.document.merge_section(name, partial);
        self.invalidate(name);
        self.mark_dirty();
    }

    /// Replaces a top-level section wholesale and schedules a debounced
    /// write. Unlike [`ConfigStore::update_section`], keys missing from
    /// `value` are dropped from the stored section.
    pub fn replace_section(&mut self, name: &str, value: JsonValue) {
        self.document.set_section(name, value);
        self.invalidate(name);
        self.mark_dirty();
    }

    pub fn set_model_path(&mut self, path: impl Into<String>) {
        self.replace_section(config::MODEL_PATH, JsonValue::String(path.into()));
    }

    pub fn set_theme(&mut self, theme: impl Into<String>) {
        self.replace_section(config::THEME, JsonValue::String(theme.into()));
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.replace_section(config::PROMPT, JsonValue::String(prompt.into()));
    }

    pub fn set_current_user_id(&mut self, user_id: Option<i64>) {
        let value = match user_id {
            Some(id) => JsonValue::from(id),
            None => JsonValue::Null,
        };
        self.replace_section(config::CURRENT_USER_ID, value);
    }

    pub fn set_generation_settings(&mut self, settings: &GenerationSettings) -> Result<()> {
        self.replace_section(config::GENERATION, serde_json::to_value(settings)?);
        Ok(())
    }

    pub fn set_history_settings(&mut self, settings: &HistorySettings) -> Result<()> {
        self.replace_section(config::HISTORY, serde_json::to_value(settings)?);
        Ok(())
    }

    pub fn set_appearance_settings(&mut self, settings: &AppearanceSettings) -> Result<()> {
        self.replace_section(config::APPEARANCE, serde_json::to_value(settings)?);
        Ok(())
    }

    /// Stores a preset under `name`, replacing any existing one.
    pub fn save_preset(&mut self, name: &str, preset: &Preset) -> Result<()> {
        let value = serde_json::to_value(preset)?;
        let mut presets = match self.document.section(config::PRESETS) {
            Some(JsonValue::Object(map)) => map.clone(),
            _ => JsonMap::new(),
        };
        presets.insert(name.to_string(), value);
        self.replace_section(config::PRESETS, JsonValue::Object(presets));
        Ok(())
    }

    /// Removes a preset; returns whether one was removed.
    pub fn delete_preset(&mut self, name: &str) -> bool {
        let Some(JsonValue::Object(map)) = self.document.section(config::PRESETS) else {
            return false;
        };
        if !map.contains_key(name) {
            return false;
        }
        let mut presets = map.clone();
        presets.remove(name);
        self.replace_section(config::PRESETS, JsonValue::Object(presets));
        true
    }

    /// Copies a preset's fields into the live configuration. Unset preset
    /// fields and an empty `model_path` leave the current values alone.
    /// Returns whether the preset existed.
    pub fn apply_preset(&mut self, name: &str) -> Result<bool> {
        let presets = self.presets();
        let Some(preset) = presets.get(name) else {
            return Ok(false);
        };
        if let Some(prompt) = &preset.prompt {
            self.set_prompt(prompt.clone());
        }
        if let Some(generation) = &preset.generation {
            self.set_generation_settings(generation)?;
        }
        if let Some(model_path) = preset.model_path.as_deref().filter(|p| !p.is_empty()) {
            self.set_model_path(model_path);
        }
        Ok(true)
    }

    // ---- write scheduling --------------------------------------------------

    /// Marks the document dirty. With `immediate` the write happens before
    /// this call returns; otherwise it fires after the debounce window.
    pub fn save(&mut self, immediate: bool) -> Result<()> {
        self.mark_dirty();
        if immediate { self.flush() } else { Ok(()) }
    }

    fn mark_dirty(&mut self) {
        self.debouncer.request(Instant::now());
    }

    /// Writes the document out if dirty: snapshots the current primary file
    /// to the backup path, then atomically replaces the primary. A clean
    /// store makes this a no-op, so calling it twice never rewrites the file.
    pub fn flush(&mut self) -> Result<()> {
        if !self.debouncer.is_pending() {
            return Ok(());
        }

        // Best-effort pre-write snapshot; a failed backup never blocks the save
        let config_file = self.paths.config_file();
        if config_file.exists() {
            match fs::copy(&config_file, self.paths.backup_file()) {
                Ok(_) => tracing::debug!("Configuration backup updated"),
                Err(e) => tracing::warn!("Failed to update configuration backup: {}", e),
            }
        }

        self.write_primary()?;
        tracing::debug!("Configuration saved to {:?}", self.file.path());
        self.debouncer.reset();
        self.section_cache.write().unwrap().clear();
        Ok(())
    }

    /// True when changes are waiting for a flush.
    pub fn has_pending_save(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Instant at which pending changes become due, if any are pending.
    pub fn next_flush_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Flushes when the debounce deadline has passed; returns whether a
    /// flush ran. On failure the deadline re-arms one window out so the
    /// driver retries later instead of spinning on a broken disk.
    pub fn flush_if_due(&mut self, now: Instant) -> Result<bool> {
        if !self.debouncer.is_due(now) {
            return Ok(false);
        }
        match self.flush() {
            Ok(()) => Ok(true),
            Err(e) => {
                self.debouncer.reset();
                self.debouncer.request(now);
                Err(e)
            }
        }
    }

    fn invalidate(&self, name: &str) {
        self.section_cache.write().unwrap().remove(name);
    }
}
