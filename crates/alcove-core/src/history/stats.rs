//! Aggregate counters over a slice of history records.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::record::{HistoryRecord, MessageRole};

/// Counters the dashboard surfaces for a set of records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogStats {
    pub total_records: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    /// Number of distinct session ids seen.
    pub sessions: usize,
    /// Occurrences per tag, across all records.
    pub tag_counts: BTreeMap<String, usize>,
}

impl LogStats {
    /// Computes counters over `records` in one pass.
    pub fn collect(records: &[HistoryRecord]) -> Self {
        let mut stats = Self::default();
        let mut session_ids = BTreeSet::new();
        for record in records {
            stats.total_records += 1;
            match record.role {
                MessageRole::User => stats.user_messages += 1,
                MessageRole::Assistant => stats.assistant_messages += 1,
            }
            session_ids.insert(record.session_id.as_str());
            for tag in &record.tags {
                *stats.tag_counts.entry(tag.clone()).or_insert(0) += 1;
            }
        }
        stats.sessions = session_ids.len();
        stats
    }
}
