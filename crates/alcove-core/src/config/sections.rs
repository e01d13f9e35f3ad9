//! Typed models for the well-known configuration sections.
//!
//! Every section has a compiled-in default. The structs carry
//! `#[serde(default)]` so a stored section that predates a schema addition
//! still deserializes, with missing keys taken from the default instance.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

/// Default system prompt handed to the inference component.
pub const DEFAULT_PROMPT: &str =
    "You are a helpful assistant. Keep answers short and to the point.";

/// Default UI theme name.
pub const DEFAULT_THEME: &str = "light";

/// Default directory scanned for model weights, relative to the app root.
pub const DEFAULT_MODEL_PATH: &str = "models";

/// Default accent color for the appearance section.
pub const DEFAULT_ACCENT_COLOR: &str = "#0078d4";

/// Text-generation parameters passed to the inference component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub max_new_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub do_sample: bool,
    pub repetition_penalty: f64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_new_tokens: 200,
            temperature: 0.8,
            top_p: 0.95,
            do_sample: true,
            repetition_penalty: 1.05,
        }
    }
}

/// A named bundle of prompt and sampling settings the user can switch
/// between. Fields left unset fall back to the current configuration when
/// the preset is applied.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Preset {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<GenerationSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_path: Option<String>,
}

/// Size and retention parameters for the conversation history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Directory the export component writes filtered records into.
    pub export_dir: PathBuf,
    /// Age in days past which live records are dropped by retention cleanup.
    /// Zero disables retention cleanup.
    pub retention_days: u32,
    /// Maximum number of records kept in the live log before the overflow
    /// rotates into an archive segment.
    pub max_records: usize,
    /// Tags the UI pre-fills into the tag field for new messages.
    pub default_tags: Vec<String>,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            export_dir: PathBuf::from("data/exports"),
            retention_days: 90,
            max_records: 500,
            default_tags: Vec::new(),
        }
    }
}

/// Paths used by the fine-tuning pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingSettings {
    pub reports_dir: PathBuf,
    pub runs_dir: PathBuf,
    pub status_file: PathBuf,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            reports_dir: PathBuf::from("data/reports"),
            runs_dir: PathBuf::from("training_runs"),
            status_file: PathBuf::from("data/reports/training_status.json"),
        }
    }
}

/// Visual preferences beyond the theme name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppearanceSettings {
    pub accent_color: String,
}

impl Default for AppearanceSettings {
    fn default() -> Self {
        Self {
            accent_color: DEFAULT_ACCENT_COLOR.to_string(),
        }
    }
}

/// Target directory for the backup component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupSettings {
    pub dir: PathBuf,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/backups"),
        }
    }
}

/// Plugin host configuration. Entries under `available` are registry blobs
/// owned by the plugin host; this layer only stores them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginSettings {
    pub enabled: Vec<String>,
    pub available: JsonMap<String, JsonValue>,
}

/// Update-check preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterSettings {
    pub auto_check: bool,
    pub channel: String,
    pub verify_models_on_start: bool,
}

impl Default for UpdaterSettings {
    fn default() -> Self {
        Self {
            auto_check: true,
            channel: "stable".to_string(),
            verify_models_on_start: true,
        }
    }
}

/// Location of the user database file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: PathBuf,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/database/app.db"),
        }
    }
}
