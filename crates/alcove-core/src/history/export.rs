//! Export seam for handing history records to a document writer.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::record::HistoryRecord;
use crate::error::Result;

/// Output formats an exporter may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Markdown,
    Pdf,
}

impl ExportFormat {
    /// File extension used for the produced document.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Markdown => "md",
            ExportFormat::Pdf => "pdf",
        }
    }
}

/// Writes a set of records to `dest` in one of the supported formats.
///
/// Implementations live with the UI layer; the stores only hand them
/// records and a destination.
pub trait HistoryExporter: Send + Sync {
    fn format(&self) -> ExportFormat;

    fn export(&self, records: &[HistoryRecord], dest: &Path) -> Result<()>;
}
