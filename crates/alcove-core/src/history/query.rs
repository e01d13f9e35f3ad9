//! History query filters.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::HistoryRecord;

/// Filter applied to history records.
///
/// All set fields must match at once. An empty query matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryQuery {
    /// Case-insensitive substring match against record content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    /// Inclusive lower bound on the record timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the record timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    /// Record must carry every listed tag.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
}

impl HistoryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn with_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// True when no filter field is set.
    pub fn is_empty(&self) -> bool {
        self.keyword.is_none() && self.start.is_none() && self.end.is_none() && self.tags.is_empty()
    }

    /// Tests a record against every set filter field.
    pub fn matches(&self, record: &HistoryRecord) -> bool {
        if let Some(keyword) = &self.keyword {
            let needle = keyword.to_lowercase();
            if !record.content.to_lowercase().contains(&needle) {
                return false;
            }
        }
        if let Some(start) = self.start {
            if record.timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if record.timestamp > end {
                return false;
            }
        }
        self.tags.iter().all(|tag| record.tags.contains(tag))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::history::record::MessageRole;

    fn record_at(content: &str, tags: &[&str], ts: DateTime<Utc>) -> HistoryRecord {
        let mut record = HistoryRecord::new(
            "session",
            MessageRole::User,
            content,
            tags.iter().map(|t| t.to_string()).collect(),
        );
        record.timestamp = ts;
        record
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let record = record_at("anything", &[], Utc::now());
        assert!(HistoryQuery::new().matches(&record));
        assert!(HistoryQuery::new().is_empty());
    }

    #[test]
    fn test_keyword_is_case_insensitive() {
        let record = record_at("Hello World", &[], Utc::now());
        assert!(HistoryQuery::new().with_keyword("hello").matches(&record));
        assert!(HistoryQuery::new().with_keyword("WORLD").matches(&record));
        assert!(!HistoryQuery::new().with_keyword("absent").matches(&record));
    }

    #[test]
    fn test_date_bounds_are_inclusive() {
        let ts = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let record = record_at("x", &[], ts);
        let query = HistoryQuery::new().with_range(ts, ts);
        assert!(query.matches(&record));

        let before = HistoryQuery::new().with_range(
            Utc.with_ymd_and_hms(2024, 6, 16, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 17, 0, 0, 0).unwrap(),
        );
        assert!(!before.matches(&record));
    }

    #[test]
    fn test_all_tags_must_be_present() {
        let record = record_at("x", &["work", "draft"], Utc::now());
        assert!(HistoryQuery::new().with_tag("work").matches(&record));
        assert!(
            HistoryQuery::new()
                .with_tag("work")
                .with_tag("draft")
                .matches(&record)
        );
        assert!(
            !HistoryQuery::new()
                .with_tag("work")
                .with_tag("missing")
                .matches(&record)
        );
    }

    #[test]
    fn test_filters_combine_conjunctively() {
        let ts = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let record = record_at("quarterly report", &["work"], ts);
        let query = HistoryQuery::new()
            .with_keyword("report")
            .with_range(
                Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap(),
            )
            .with_tag("work");
        assert!(query.matches(&record));

        let wrong_tag = query.clone().with_tag("personal");
        assert!(!wrong_tag.matches(&record));
    }
}
