//! Unsent message drafts, kept per session so a restart restores the input box.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Text the user typed but has not sent yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub message: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub updated_at: DateTime<Utc>,
}

impl Draft {
    pub fn new(message: impl Into<String>, tags: BTreeSet<String>) -> Self {
        Self {
            message: message.into(),
            tags,
            updated_at: Utc::now(),
        }
    }

    /// A draft with no text and no tags carries nothing worth keeping.
    pub fn is_empty(&self) -> bool {
        self.message.trim().is_empty() && self.tags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_message_without_tags_is_empty() {
        assert!(Draft::new("   ", BTreeSet::new()).is_empty());
        assert!(!Draft::new("hello", BTreeSet::new()).is_empty());
    }

    #[test]
    fn test_tags_alone_keep_a_draft() {
        let tags: BTreeSet<String> = ["work".to_string()].into();
        assert!(!Draft::new("", tags).is_empty());
    }
}
