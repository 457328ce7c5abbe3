//! Last-visit tracking.

use crate::collation;
use crate::documents::DocumentStore;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Spacing given to entries of the legacy list format when migrating.
const LEGACY_STEP_MS: i64 = 1000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RecencyTracker {
    visited: HashMap<String, i64>,
}

/// Accepted shapes of the visited blob.
#[derive(Deserialize)]
#[serde(untagged)]
enum VisitedRecord {
    Times(HashMap<String, i64>),
    /// Names ordered most recent first, written by older versions.
    Legacy(Vec<String>),
}

impl RecencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a persisted blob.
    ///
    /// The legacy list format is converted on the fly, giving entry `i` the
    /// timestamp `now - i` seconds; the flag reports that a conversion
    /// happened and the blob should be rewritten.
    pub fn from_json(raw: &str, now_ms: i64) -> serde_json::Result<(Self, bool)> {
        match serde_json::from_str(raw)? {
            VisitedRecord::Times(visited) => Ok((Self { visited }, false)),
            VisitedRecord::Legacy(names) => {
                let mut visited = HashMap::new();
                for (i, name) in names.into_iter().enumerate() {
                    visited
                        .entry(name)
                        .or_insert(now_ms - i as i64 * LEGACY_STEP_MS);
                }
                Ok((Self { visited }, true))
            }
        }
    }

    /// Record a visit now.
    pub fn touch(&mut self, name: &str) {
        self.touch_at(name, Utc::now().timestamp_millis());
    }

    pub fn touch_at(&mut self, name: &str, epoch_ms: i64) {
        self.visited.insert(name.to_string(), epoch_ms);
    }

    pub fn last_visit(&self, name: &str) -> Option<i64> {
        self.visited.get(name).copied()
    }

    /// Page names, most recently visited first; unseen pages last.
    pub fn recency_order(&self, documents: &DocumentStore) -> Vec<String> {
        let mut names: Vec<String> = documents.names().map(str::to_string).collect();
        names.sort_by(|a, b| {
            let visited_a = self.last_visit(a).unwrap_or(0);
            let visited_b = self.last_visit(b).unwrap_or(0);
            visited_b
                .cmp(&visited_a)
                .then_with(|| collation::compare(a, b))
        });
        names
    }

    pub fn len(&self) -> usize {
        self.visited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn documents(names: &[&str]) -> DocumentStore {
        let mut docs = DocumentStore::new();
        for name in names {
            docs.set(name, "");
        }
        docs
    }

    #[test]
    fn test_recency_order() {
        let mut tracker = RecencyTracker::new();
        tracker.touch_at("Old", 1_000);
        tracker.touch_at("New", 5_000);
        tracker.touch_at("Middle", 3_000);
        tracker.touch_at("Deleted", 9_000);

        let docs = documents(&["Middle", "Unseen", "Old", "New", "another"]);
        assert_eq!(
            tracker.recency_order(&docs),
            vec!["New", "Middle", "Old", "another", "Unseen"]
        );
    }

    #[test]
    fn test_touch_overwrites() {
        let mut tracker = RecencyTracker::new();
        tracker.touch_at("A", 10);
        tracker.touch_at("A", 20);
        assert_eq!(tracker.last_visit("A"), Some(20));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_touch_uses_wall_clock() {
        let before = Utc::now().timestamp_millis();
        let mut tracker = RecencyTracker::new();
        tracker.touch("A");
        assert!(tracker.last_visit("A").unwrap() >= before);
    }

    #[test]
    fn test_from_json_map() {
        let (tracker, migrated) = RecencyTracker::from_json(r#"{"Home":42}"#, 0).unwrap();
        assert!(!migrated);
        assert_eq!(tracker.last_visit("Home"), Some(42));
    }

    #[test]
    fn test_from_json_legacy_list() {
        let (tracker, migrated) =
            RecencyTracker::from_json(r#"["Newest","Older","Oldest"]"#, 10_000).unwrap();
        assert!(migrated);
        assert_eq!(tracker.last_visit("Newest"), Some(10_000));
        assert_eq!(tracker.last_visit("Older"), Some(9_000));
        assert_eq!(tracker.last_visit("Oldest"), Some(8_000));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(RecencyTracker::from_json("42", 0).is_err());
        assert!(RecencyTracker::from_json("{", 0).is_err());
    }
}
