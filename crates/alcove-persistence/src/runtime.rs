//! Async wiring for sharing the stores across tasks.
//!
//! [`ConfigStore`] itself is single-owner with `&mut` mutations;
//! [`SharedConfigStore`] puts it behind a `tokio::sync::Mutex` and runs the
//! debounce deadline on a dedicated flush-driver task, which replaces the
//! event-loop timer a desktop shell would otherwise provide. [`HistoryLog`]
//! synchronizes internally, so `Arc<HistoryLog>` is its shared handle and
//! needs nothing from this module.

use std::sync::Arc;
use std::time::Instant;

use alcove_core::config::{GenerationSettings, HistorySettings, LoadOutcome};
use alcove_core::error::Result;
use serde_json::Value as JsonValue;
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;

use crate::config_store::ConfigStore;
use crate::paths::StorePaths;

/// Clonable, task-safe handle to a [`ConfigStore`].
///
/// All mutations go through the mutex, so there is exactly one writer at a
/// time; the [`Notify`] wakes the flush driver whenever the debounce deadline
/// may have moved.
#[derive(Clone)]
pub struct SharedConfigStore {
    inner: Arc<Mutex<ConfigStore>>,
    changed: Arc<Notify>,
}

impl SharedConfigStore {
    /// Opens the underlying store and wraps it for sharing.
    pub fn open(paths: StorePaths) -> (Self, LoadOutcome) {
        let (store, outcome) = ConfigStore::open(paths);
        (Self::new(store), outcome)
    }

    pub fn new(store: ConfigStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
            changed: Arc::new(Notify::new()),
        }
    }

    /// Runs a closure against the store under the lock.
    pub async fn read<R>(&self, f: impl FnOnce(&ConfigStore) -> R) -> R {
        let store = self.inner.lock().await;
        f(&store)
    }

    /// Runs a mutating closure against the store under the lock and wakes
    /// the flush driver afterwards.
    pub async fn write<R>(&self, f: impl FnOnce(&mut ConfigStore) -> R) -> R {
        let result = {
            let mut store = self.inner.lock().await;
            f(&mut store)
        };
        self.changed.notify_one();
        result
    }

    pub async fn get_section(&self, name: &str) -> JsonValue {
        self.read(|store| store.get_section(name)).await
    }

    pub async fn update_section(&self, name: &str, partial: JsonValue) {
        self.write(|store| store.update_section(name, partial)).await
    }

    pub async fn replace_section(&self, name: &str, value: JsonValue) {
        self.write(|store| store.replace_section(name, value)).await
    }

    pub async fn generation_settings(&self) -> GenerationSettings {
        self.read(|store| store.generation_settings()).await
    }

    pub async fn history_settings(&self) -> HistorySettings {
        self.read(|store| store.history_settings()).await
    }

    pub async fn save(&self, immediate: bool) -> Result<()> {
        self.write(|store| store.save(immediate)).await
    }

    pub async fn flush(&self) -> Result<()> {
        self.write(|store| store.flush()).await
    }

    pub async fn reload(&self) -> LoadOutcome {
        self.write(|store| store.reload()).await
    }

    pub async fn has_pending_save(&self) -> bool {
        self.read(|store| store.has_pending_save()).await
    }

    /// Drives debounced flushes until `shutdown` fires, then drains any
    /// pending write so a clean exit never drops changes.
    ///
    /// The driver sleeps until the store's next flush deadline, re-evaluating
    /// whenever a write moves it. Flush failures are logged and retried one
    /// debounce window later; they never stop the driver.
    pub async fn run_flush_driver(&self, shutdown: CancellationToken) {
        tracing::debug!("Configuration flush driver started");
        loop {
            let deadline = {
                let store = self.inner.lock().await;
                store.next_flush_deadline()
            };

            match deadline {
                Some(deadline) => {
                    let sleep = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline));
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        // A new change may have pushed the deadline out
                        _ = self.changed.notified() => {}
                        _ = sleep => {
                            let mut store = self.inner.lock().await;
                            if let Err(e) = store.flush_if_due(Instant::now()) {
                                tracing::error!("Debounced configuration flush failed: {}", e);
                            }
                        }
                    }
                }
                None => {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = self.changed.notified() => {}
                    }
                }
            }
        }

        // Drain on shutdown
        let mut store = self.inner.lock().await;
        if store.has_pending_save() {
            if let Err(e) = store.flush() {
                tracing::error!("Final configuration flush on shutdown failed: {}", e);
            } else {
                tracing::debug!("Pending configuration changes flushed on shutdown");
            }
        }
    }
}
