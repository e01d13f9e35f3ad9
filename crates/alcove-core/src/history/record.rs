//! Conversation history record types.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The author of a history record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message typed by the user.
    User,
    /// Message produced by the inference component.
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// One conversation turn in the history log.
///
/// Records are immutable once written: they are created by an append, moved
/// wholesale into an archive segment on rotation, and dropped by retention
/// cleanup or an explicit clear. Nothing ever rewrites one in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: Uuid,
    /// Grouping key for the process run that produced this record.
    pub session_id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Creation time, RFC3339 on the wire.
    pub timestamp: DateTime<Utc>,
}

impl HistoryRecord {
    /// Creates a record stamped with a fresh id and the current time.
    pub fn new(
        session_id: impl Into<String>,
        role: MessageRole,
        content: impl Into<String>,
        tags: BTreeSet<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: session_id.into(),
            role,
            content: content.into(),
            tags,
            timestamp: Utc::now(),
        }
    }
}
