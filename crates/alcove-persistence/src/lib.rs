pub mod config_store;
pub mod debounce;
pub mod draft_store;
pub mod history_log;
pub mod paths;
pub mod runtime;
pub mod storage;

pub use crate::config_store::{ConfigStore, WRITE_DEBOUNCE};
pub use crate::debounce::Debouncer;
pub use crate::draft_store::DraftStore;
pub use crate::history_log::HistoryLog;
pub use crate::paths::StorePaths;
pub use crate::runtime::SharedConfigStore;
