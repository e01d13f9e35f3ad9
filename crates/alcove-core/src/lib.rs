pub mod config;
pub mod error;
pub mod history;
pub mod inference;

// Re-export common error type
pub use error::{Result, StoreError};

pub use config::{ConfigDocument, LoadOutcome};
pub use history::{HistoryQuery, HistoryRecord, MessageRole};
pub use inference::ResponseGenerator;
