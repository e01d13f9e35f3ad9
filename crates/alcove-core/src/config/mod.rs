//! Configuration document model.
//!
//! The configuration is a tree of named top-level sections stored as one JSON
//! object. [`ConfigDocument`] owns that object, validates its structure, and
//! heals gaps against the compiled-in defaults. All file I/O lives in the
//! persistence crate; this model is pure.

mod sections;

pub use sections::{
    AppearanceSettings, BackupSettings, DatabaseSettings, GenerationSettings, HistorySettings,
    PluginSettings, Preset, TrainingSettings, UpdaterSettings, DEFAULT_ACCENT_COLOR,
    DEFAULT_MODEL_PATH, DEFAULT_PROMPT, DEFAULT_THEME,
};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::error::{Result, StoreError};

/// Section key: filesystem location of the model weights.
pub const MODEL_PATH: &str = "model_path";
/// Section key: UI theme name.
pub const THEME: &str = "theme";
/// Section key: system prompt for the inference component.
pub const PROMPT: &str = "prompt";
/// Section key: text-generation parameters.
pub const GENERATION: &str = "generation";
/// Section key: named prompt/generation presets.
pub const PRESETS: &str = "presets";
/// Section key: history log size and retention parameters.
pub const HISTORY: &str = "history";
/// Section key: fine-tuning pipeline paths.
pub const TRAINING: &str = "training";
/// Section key: visual preferences.
pub const APPEARANCE: &str = "appearance";
/// Section key: backup component target directory.
pub const BACKUP: &str = "backup";
/// Section key: plugin host configuration.
pub const PLUGINS: &str = "plugins";
/// Section key: update-check preferences.
pub const UPDATER: &str = "updater";
/// Section key: user database location.
pub const DATABASE: &str = "database";
/// Section key: id of the signed-in user, `null` when nobody is.
pub const CURRENT_USER_ID: &str = "current_user_id";

/// Every section with a compiled-in default, in on-disk order.
///
/// Validation fills any of these that are missing. Keys outside this list
/// (for example the window-geometry blobs written by the UI) are preserved
/// untouched but never healed.
pub const SECTION_NAMES: [&str; 13] = [
    MODEL_PATH,
    THEME,
    PROMPT,
    GENERATION,
    PRESETS,
    HISTORY,
    TRAINING,
    APPEARANCE,
    BACKUP,
    PLUGINS,
    UPDATER,
    DATABASE,
    CURRENT_USER_ID,
];

/// How a configuration load ended up producing a valid document.
///
/// Recovery is an ordinary, inspectable branch rather than caught-and-dropped
/// control flow: a load never fails, it only reports which path it took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadOutcome {
    /// The primary file parsed and validated (healing may still have filled
    /// missing sections).
    Loaded,
    /// The primary file was unusable; the document came from the backup and
    /// was written back as the new primary.
    Recovered,
    /// Neither primary nor backup was usable (or no file existed yet); the
    /// compiled-in defaults were used and persisted.
    FellBackToDefaults,
}

/// The in-memory configuration document.
///
/// Owned exclusively by the config store; collaborators only ever receive
/// value copies through the section accessors, so no outside mutation can
/// bypass validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDocument {
    root: JsonMap<String, JsonValue>,
}

impl ConfigDocument {
    /// Builds the full default document from the compiled-in section defaults.
    pub fn compiled_default() -> Self {
        let mut root = JsonMap::new();
        for name in SECTION_NAMES {
            if let Some(value) = default_section_value(name) {
                root.insert(name.to_string(), value);
            }
        }
        Self { root }
    }

    /// Validates a parsed JSON value as a configuration document.
    ///
    /// A value that is not a JSON object is unrecoverable and fails with
    /// [`StoreError::ConfigCorrupt`]. Anything else succeeds: missing sections
    /// are filled from defaults and sections of the wrong shape are replaced
    /// wholesale. The returned list names the sections that were healed, so
    /// the caller knows the document diverged from disk and must be
    /// re-persisted.
    pub fn from_value(value: JsonValue) -> Result<(Self, Vec<&'static str>)> {
        let JsonValue::Object(root) = value else {
            return Err(StoreError::corrupt(format!(
                "expected an object, found {}",
                json_type_name(&value)
            )));
        };
        let mut document = Self { root };
        let healed = document.heal();
        Ok((document, healed))
    }

    /// Fills missing sections and replaces malformed ones from the defaults.
    fn heal(&mut self) -> Vec<&'static str> {
        let mut healed = Vec::new();
        for name in SECTION_NAMES {
            let Some(default) = default_section_value(name) else {
                continue;
            };
            match self.root.get(name) {
                Some(existing) if section_shape_ok(name, existing) => {}
                _ => {
                    self.root.insert(name.to_string(), default);
                    healed.push(name);
                }
            }
        }
        healed
    }

    /// Returns the stored value of a section without default-merging.
    pub fn section(&self, name: &str) -> Option<&JsonValue> {
        self.root.get(name)
    }

    /// Returns a section with keys missing relative to its compiled default
    /// filled in (shallow merge). Callers always see a fully-populated
    /// section even when the on-disk document predates a schema addition.
    pub fn merged_section(&self, name: &str) -> JsonValue {
        match (default_section_value(name), self.root.get(name)) {
            (Some(JsonValue::Object(mut merged)), Some(JsonValue::Object(stored))) => {
                for (key, value) in stored {
                    merged.insert(key.clone(), value.clone());
                }
                JsonValue::Object(merged)
            }
            (_, Some(stored)) => stored.clone(),
            (Some(default), None) => default,
            (None, None) => JsonValue::Null,
        }
    }

    /// Deserializes the default-merged section into its typed model.
    pub fn typed_section<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        Ok(serde_json::from_value(self.merged_section(name))?)
    }

    /// Replaces a section wholesale.
    pub fn set_section(&mut self, name: &str, value: JsonValue) {
        self.root.insert(name.to_string(), value);
    }

    /// Shallow-merges `partial` into a section: object-into-object merges
    /// key by key, anything else replaces the section.
    pub fn merge_section(&mut self, name: &str, partial: JsonValue) {
        match (self.root.get_mut(name), partial) {
            (Some(JsonValue::Object(existing)), JsonValue::Object(partial)) => {
                for (key, value) in partial {
                    existing.insert(key, value);
                }
            }
            (_, partial) => {
                self.root.insert(name.to_string(), partial);
            }
        }
    }

    /// True if the document contains a key (healed sections always do).
    pub fn contains(&self, name: &str) -> bool {
        self.root.contains_key(name)
    }

    /// The document as a serializable JSON value.
    pub fn to_value(&self) -> JsonValue {
        JsonValue::Object(self.root.clone())
    }
}

/// Compiled-in default for a known section, `None` for free-form keys.
fn default_section_value(name: &str) -> Option<JsonValue> {
    let value = match name {
        MODEL_PATH => JsonValue::String(DEFAULT_MODEL_PATH.to_string()),
        THEME => JsonValue::String(DEFAULT_THEME.to_string()),
        PROMPT => JsonValue::String(DEFAULT_PROMPT.to_string()),
        GENERATION => to_json(GenerationSettings::default()),
        PRESETS => JsonValue::Object(JsonMap::new()),
        HISTORY => to_json(HistorySettings::default()),
        TRAINING => to_json(TrainingSettings::default()),
        APPEARANCE => to_json(AppearanceSettings::default()),
        BACKUP => to_json(BackupSettings::default()),
        PLUGINS => to_json(PluginSettings::default()),
        UPDATER => to_json(UpdaterSettings::default()),
        DATABASE => to_json(DatabaseSettings::default()),
        CURRENT_USER_ID => JsonValue::Null,
        _ => return None,
    };
    Some(value)
}

/// Expected shape of a known section's value.
fn section_shape_ok(name: &str, value: &JsonValue) -> bool {
    match name {
        MODEL_PATH | THEME | PROMPT => value.is_string(),
        CURRENT_USER_ID => value.is_null() || value.is_i64() || value.is_u64(),
        _ => value.is_object(),
    }
}

fn to_json<T: Serialize>(value: T) -> JsonValue {
    serde_json::to_value(value).unwrap_or(JsonValue::Null)
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
