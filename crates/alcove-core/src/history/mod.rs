//! Conversation history domain types: records, queries, drafts, and the
//! export seam. Persistence for these lives in `alcove-persistence`.

mod draft;
mod export;
mod query;
mod record;
mod stats;

pub use draft::Draft;
pub use export::{ExportFormat, HistoryExporter};
pub use query::HistoryQuery;
pub use record::{HistoryRecord, MessageRole};
pub use stats::LogStats;
