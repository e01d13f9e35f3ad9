//! Append-only conversation history log.
//!
//! Live records sit in one JSON array file, bounded by `max_records` from the
//! history settings. Overflow moves into timestamped archive segments under
//! `data/archives/` and never comes back; queries see the live log only.

use std::collections::BTreeSet;
use std::fs;
use std::sync::RwLock;

use alcove_core::config::HistorySettings;
use alcove_core::error::{Result, StoreError};
use alcove_core::history::{HistoryQuery, HistoryRecord, LogStats, MessageRole};
use chrono::{DateTime, Duration, Utc};

use crate::config_store::ConfigStore;
use crate::paths::StorePaths;
use crate::storage::AtomicJsonFile;

/// Filename prefix for archive segments.
const ARCHIVE_PREFIX: &str = "chat-";

/// Durable, size-bounded record of conversation turns.
///
/// The live log is held in memory and written through on every mutation; the
/// write lock is held across the disk write, so concurrent appenders are
/// serialized rather than racing on load-modify-persist.
pub struct HistoryLog {
    paths: StorePaths,
    file: AtomicJsonFile<Vec<HistoryRecord>>,
    records: RwLock<Vec<HistoryRecord>>,
    settings: HistorySettings,
    session_id: String,
}

impl HistoryLog {
    /// Opens the log with size and retention settings taken from the
    /// configuration store.
    pub fn open(paths: StorePaths, config: &ConfigStore) -> Result<Self> {
        Self::with_settings(paths, config.history_settings())
    }

    /// Opens the log with explicit settings.
    ///
    /// Unlike the config store, a corrupt live log is an error rather than a
    /// silent reset: the file is left untouched for inspection and the caller
    /// decides whether to clear it.
    pub fn with_settings(paths: StorePaths, settings: HistorySettings) -> Result<Self> {
        let file = AtomicJsonFile::new(paths.history_file());
        let records: Vec<HistoryRecord> = file
            .load()
            .map_err(|e| StoreError::persistence(paths.history_file(), e))?
            .unwrap_or_default();
        tracing::debug!(
            "History log opened with {} live records from {:?}",
            records.len(),
            paths.history_file()
        );

        Ok(Self {
            file,
            records: RwLock::new(records),
            settings,
            session_id: Utc::now().format("%Y%m%d-%H%M%S").to_string(),
            paths,
        })
    }

    /// Grouping key stamped onto every record appended by this instance.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn settings(&self) -> &HistorySettings {
        &self.settings
    }

    /// Appends one conversation turn and persists the live file.
    ///
    /// If the live count now exceeds `max_records`, the oldest overflow moves
    /// into an archive segment first, so a crash between the two writes can
    /// duplicate a record across files but never lose one.
    pub fn append(
        &self,
        role: MessageRole,
        content: impl Into<String>,
        tags: BTreeSet<String>,
    ) -> Result<HistoryRecord> {
        let record = HistoryRecord::new(&self.session_id, role, content, tags);

        let mut records = self.records.write().unwrap();
        records.push(record.clone());
        self.rotate_overflow(&mut records)?;
        self.persist_live(&records)?;
        Ok(record)
    }

    /// Returns the most recent `limit` live records in append order.
    /// `None` or zero returns the whole live log.
    pub fn load(&self, limit: Option<usize>) -> Vec<HistoryRecord> {
        let records = self.records.read().unwrap();
        match limit {
            None | Some(0) => records.clone(),
            Some(n) => records[records.len().saturating_sub(n)..].to_vec(),
        }
    }

    /// Returns live records matching every set filter field. Archive
    /// segments are never scanned here; they are reachable only through
    /// [`HistoryLog::read_archive`].
    pub fn query(&self, query: &HistoryQuery) -> Vec<HistoryRecord> {
        let records = self.records.read().unwrap();
        records
            .iter()
            .filter(|record| query.matches(record))
            .cloned()
            .collect()
    }

    /// Aggregate counters over the live log.
    pub fn stats(&self) -> LogStats {
        let records = self.records.read().unwrap();
        LogStats::collect(&records)
    }

    /// Lists archive segment filenames, oldest first.
    pub fn list_archives(&self) -> Result<Vec<String>> {
        let archives_dir = self.paths.archives_dir();
        if !archives_dir.exists() {
            return Ok(Vec::new());
        }

        let entries =
            fs::read_dir(&archives_dir).map_err(|e| StoreError::persistence(&archives_dir, e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::persistence(&archives_dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(ARCHIVE_PREFIX) && name.ends_with(".json") {
                names.push(name);
            }
        }
        // Zero-padded timestamps make lexicographic order chronological
        names.sort();
        Ok(names)
    }

    /// Reads one archive segment by filename.
    pub fn read_archive(&self, name: &str) -> Result<Vec<HistoryRecord>> {
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(StoreError::not_found("archive segment", name));
        }
        let path = self.paths.archives_dir().join(name);
        if !path.exists() {
            return Err(StoreError::not_found("archive segment", name));
        }

        let segment = AtomicJsonFile::<Vec<HistoryRecord>>::new(path.clone());
        let records = segment
            .load()
            .map_err(|e| StoreError::persistence(&path, e))?
            .unwrap_or_default();
        Ok(records)
    }

    /// Deletes the live log file and every archive segment. Irreversible and
    /// only ever triggered by an explicit user action.
    pub fn clear_all(&self) -> Result<()> {
        let mut records = self.records.write().unwrap();

        self.file
            .remove()
            .map_err(|e| StoreError::persistence(self.paths.history_file(), e))?;

        let archives_dir = self.paths.archives_dir();
        if archives_dir.exists() {
            let entries = fs::read_dir(&archives_dir)
                .map_err(|e| StoreError::persistence(&archives_dir, e))?;
            for entry in entries {
                let entry = entry.map_err(|e| StoreError::persistence(&archives_dir, e))?;
                let path = entry.path();
                fs::remove_file(&path).map_err(|e| StoreError::persistence(&path, e))?;
            }
        }

        records.clear();
        tracing::info!("History log and archives cleared");
        Ok(())
    }

    /// Drops live records older than `retention_days` and rewrites the live
    /// file. Removed records are not archived; this is lifecycle policy, not
    /// capacity rotation. Zero days disables cleanup. Returns the number of
    /// records removed.
    pub fn cleanup_by_retention(&self, retention_days: u32) -> Result<usize> {
        if retention_days == 0 {
            return Ok(0);
        }

        // A window wider than the calendar clamps to "keep everything"
        // instead of overflowing the date arithmetic.
        let threshold = Utc::now()
            .checked_sub_signed(Duration::days(i64::from(retention_days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut records = self.records.write().unwrap();
        let before = records.len();
        records.retain(|record| record.timestamp >= threshold);
        let removed = before - records.len();

        if removed > 0 {
            self.persist_live(&records)?;
            tracing::info!(
                "Retention cleanup removed {} records older than {} days",
                removed,
                retention_days
            );
        }
        Ok(removed)
    }

    /// Moves overflow beyond `max_records` into an archive segment. A zero
    /// `max_records` leaves the live log unbounded.
    fn rotate_overflow(&self, records: &mut Vec<HistoryRecord>) -> Result<()> {
        let max = self.settings.max_records;
        if max == 0 || records.len() <= max {
            return Ok(());
        }

        let overflow: Vec<HistoryRecord> = records.drain(..records.len() - max).collect();
        let name = format!(
            "{}{}.json",
            ARCHIVE_PREFIX,
            Utc::now().format("%Y%m%d-%H%M%S")
        );
        let path = self.paths.archives_dir().join(&name);
        let segment = AtomicJsonFile::<Vec<HistoryRecord>>::new(path.clone());

        // Rotations landing on the same second extend the existing segment
        // instead of clobbering it, keeping records in original order.
        let mut archived = segment
            .load()
            .map_err(|e| StoreError::persistence(&path, e))?
            .unwrap_or_default();
        let count = overflow.len();
        archived.extend(overflow);
        segment
            .save(&archived)
            .map_err(|e| StoreError::persistence(&path, e))?;

        tracing::info!("Archived {} history records to {}", count, name);
        Ok(())
    }

    fn persist_live(&self, records: &[HistoryRecord]) -> Result<()> {
        self.file
            .save(&records.to_vec())
            .map_err(|e| StoreError::persistence(self.paths.history_file(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn log_with_max(dir: &TempDir, max_records: usize) -> HistoryLog {
        let settings = HistorySettings {
            max_records,
            ..HistorySettings::default()
        };
        HistoryLog::with_settings(StorePaths::new(dir.path()), settings).unwrap()
    }

    fn no_tags() -> BTreeSet<String> {
        BTreeSet::new()
    }

    #[test]
    fn test_append_persists_and_reopens() {
        let dir = TempDir::new().unwrap();
        let log = log_with_max(&dir, 100);

        log.append(MessageRole::User, "hello", no_tags()).unwrap();
        log.append(MessageRole::Assistant, "hi there", no_tags())
            .unwrap();

        let reopened = log_with_max(&dir, 100);
        let records = reopened.load(None);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].role, MessageRole::User);
        assert_eq!(records[1].content, "hi there");
        // Both turns came from the same process run
        assert_eq!(records[0].session_id, records[1].session_id);
    }

    #[test]
    fn test_load_limit_returns_most_recent_in_order() {
        let dir = TempDir::new().unwrap();
        let log = log_with_max(&dir, 100);
        for i in 1..=5 {
            log.append(MessageRole::User, format!("msg {i}"), no_tags())
                .unwrap();
        }

        let last_two = log.load(Some(2));
        assert_eq!(last_two.len(), 2);
        assert_eq!(last_two[0].content, "msg 4");
        assert_eq!(last_two[1].content, "msg 5");

        assert_eq!(log.load(None).len(), 5);
        assert_eq!(log.load(Some(0)).len(), 5);
        assert_eq!(log.load(Some(50)).len(), 5);
    }

    #[test]
    fn test_overflow_rotates_into_one_archive_segment() {
        let dir = TempDir::new().unwrap();
        let log = log_with_max(&dir, 5);
        for i in 1..=7 {
            log.append(MessageRole::User, format!("msg {i}"), no_tags())
                .unwrap();
        }

        let live = log.load(None);
        assert_eq!(live.len(), 5);
        assert_eq!(live[0].content, "msg 3");
        assert_eq!(live[4].content, "msg 7");

        let archives = log.list_archives().unwrap();
        assert_eq!(archives.len(), 1);

        let archived = log.read_archive(&archives[0]).unwrap();
        let contents: Vec<_> = archived.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, vec!["msg 1", "msg 2"]);
    }

    #[test]
    fn test_zero_max_records_disables_rotation() {
        let dir = TempDir::new().unwrap();
        let log = log_with_max(&dir, 0);
        for i in 0..10 {
            log.append(MessageRole::User, format!("msg {i}"), no_tags())
                .unwrap();
        }
        assert_eq!(log.load(None).len(), 10);
        assert!(log.list_archives().unwrap().is_empty());
    }

    #[test]
    fn test_query_is_conjunctive_and_live_only() {
        let dir = TempDir::new().unwrap();
        let log = log_with_max(&dir, 2);

        let work: BTreeSet<String> = ["work".to_string()].into();
        log.append(MessageRole::User, "quarterly report", work.clone())
            .unwrap();
        log.append(MessageRole::User, "lunch plans", no_tags())
            .unwrap();
        // Pushes the first two records out of the live log
        log.append(MessageRole::User, "report follow-up", work.clone())
            .unwrap();
        log.append(MessageRole::Assistant, "noted", no_tags())
            .unwrap();

        let hits = log.query(&HistoryQuery::new().with_keyword("REPORT").with_tag("work"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "report follow-up");

        // The archived "quarterly report" is reachable only via the archive
        let everything = log.query(&HistoryQuery::new());
        assert_eq!(everything.len(), 2);
    }

    #[test]
    fn test_clear_all_removes_live_and_archives() {
        let dir = TempDir::new().unwrap();
        let log = log_with_max(&dir, 2);
        for i in 0..5 {
            log.append(MessageRole::User, format!("msg {i}"), no_tags())
                .unwrap();
        }
        assert!(!log.list_archives().unwrap().is_empty());

        log.clear_all().unwrap();

        assert!(log.load(None).is_empty());
        assert!(log.list_archives().unwrap().is_empty());
        assert!(!StorePaths::new(dir.path()).history_file().exists());
    }

    #[test]
    fn test_cleanup_by_retention_drops_old_records() {
        let dir = TempDir::new().unwrap();
        let paths = StorePaths::new(dir.path());

        // Seed the live file with one stale and one fresh record
        let mut old = HistoryRecord::new("20200101-000000", MessageRole::User, "old", no_tags());
        old.timestamp = Utc::now() - Duration::days(2);
        let fresh = HistoryRecord::new("20200101-000000", MessageRole::User, "fresh", no_tags());
        AtomicJsonFile::new(paths.history_file())
            .save(&vec![old, fresh])
            .unwrap();

        let log = log_with_max(&dir, 100);
        let removed = log.cleanup_by_retention(1).unwrap();
        assert_eq!(removed, 1);

        let live = log.load(None);
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].content, "fresh");
        // Dropped, not archived
        assert!(log.list_archives().unwrap().is_empty());

        // And the rewrite reached disk
        let reopened = log_with_max(&dir, 100);
        assert_eq!(reopened.load(None).len(), 1);
    }

    #[test]
    fn test_cleanup_with_zero_days_is_disabled() {
        let dir = TempDir::new().unwrap();
        let log = log_with_max(&dir, 100);
        log.append(MessageRole::User, "keep me", no_tags()).unwrap();

        assert_eq!(log.cleanup_by_retention(0).unwrap(), 0);
        assert_eq!(log.load(None).len(), 1);
    }

    #[test]
    fn test_cleanup_with_oversized_retention_keeps_everything() {
        let dir = TempDir::new().unwrap();
        let log = log_with_max(&dir, 100);
        log.append(MessageRole::User, "keep me", no_tags()).unwrap();

        // Larger than the representable date range; must not panic
        assert_eq!(log.cleanup_by_retention(200_000_000).unwrap(), 0);
        assert_eq!(log.load(None).len(), 1);
    }

    #[test]
    fn test_read_archive_rejects_missing_and_traversal_names() {
        let dir = TempDir::new().unwrap();
        let log = log_with_max(&dir, 100);

        assert!(log.read_archive("chat-nope.json").unwrap_err().is_not_found());
        assert!(
            log.read_archive("../config/config.json")
                .unwrap_err()
                .is_not_found()
        );
    }

    #[test]
    fn test_corrupt_live_log_is_an_error_not_a_reset() {
        let dir = TempDir::new().unwrap();
        let paths = StorePaths::new(dir.path());
        fs::create_dir_all(paths.data_dir()).unwrap();
        fs::write(paths.history_file(), "{broken").unwrap();

        let result = HistoryLog::with_settings(paths.clone(), HistorySettings::default());
        assert!(result.is_err());
        // The file is preserved for inspection
        assert!(paths.history_file().exists());
    }

    #[test]
    fn test_stats_cover_live_records() {
        let dir = TempDir::new().unwrap();
        let log = log_with_max(&dir, 100);
        log.append(MessageRole::User, "q", no_tags()).unwrap();
        log.append(MessageRole::Assistant, "a", no_tags()).unwrap();

        let stats = log.stats();
        assert_eq!(stats.total_records, 2);
        assert_eq!(stats.user_messages, 1);
        assert_eq!(stats.assistant_messages, 1);
        assert_eq!(stats.sessions, 1);
    }
}
