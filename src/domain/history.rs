use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One day's catalog churn: market addresses added to and removed from the
/// upstream catalog relative to the previous snapshot. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: NaiveDate,
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl HistoryEntry {
    pub fn new(date: NaiveDate, added: Vec<String>, removed: Vec<String>) -> Self {
        Self {
            date,
            added,
            removed,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}
