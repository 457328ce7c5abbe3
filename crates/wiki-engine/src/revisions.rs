//! Global revision log.
//!
//! Every commit of page content, including restores of older versions, is
//! appended to one sequence shared by all pages. The sequence is capped as a
//! whole: once it is full, each append evicts the oldest entry no matter
//! which page it belongs to, so a rarely edited page can lose its entire
//! history to churn elsewhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of revisions kept across all pages.
pub const HISTORY_CAP: usize = 100;

/// An immutable snapshot of a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub page: String,
    pub time: DateTime<Utc>,
    pub content: String,
}

/// A revision of one page, addressed by its position in the global log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionEntry<'a> {
    pub time: DateTime<Utc>,
    pub content: &'a str,
    pub original_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RevisionLog {
    entries: Vec<Revision>,
    cap: usize,
}

impl Default for RevisionLog {
    fn default() -> Self {
        Self::new()
    }
}

impl RevisionLog {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            cap: HISTORY_CAP,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_cap(cap: usize) -> Self {
        Self {
            entries: Vec::new(),
            cap: cap.max(1),
        }
    }

    /// Load existing entries, keeping only the newest [`HISTORY_CAP`].
    pub fn from_entries(entries: Vec<Revision>) -> Self {
        let mut log = Self::new();
        log.replace_all(entries);
        log
    }

    /// Record `content` for `page` at the current time.
    ///
    /// Returns the index of the new entry after eviction.
    pub fn append(&mut self, page: &str, content: &str) -> usize {
        self.append_at(page, content, Utc::now())
    }

    pub fn append_at(&mut self, page: &str, content: &str, time: DateTime<Utc>) -> usize {
        self.entries.push(Revision {
            page: page.to_string(),
            time,
            content: content.to_string(),
        });
        self.enforce_cap();
        self.entries.len() - 1
    }

    /// Revisions of `page`, newest first.
    pub fn versions_for(&self, page: &str) -> Vec<VersionEntry<'_>> {
        self.entries
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, revision)| revision.page == page)
            .map(|(original_index, revision)| VersionEntry {
                time: revision.time,
                content: &revision.content,
                original_index,
            })
            .collect()
    }

    /// Look up a revision by its position, `None` once it has been evicted.
    pub fn get(&self, index: usize) -> Option<&Revision> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[Revision] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn replace_all(&mut self, entries: Vec<Revision>) {
        self.entries = entries;
        self.enforce_cap();
    }

    fn enforce_cap(&mut self) {
        if self.entries.len() > self.cap {
            let excess = self.entries.len() - self.cap;
            self.entries.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
    }

    #[test]
    fn test_versions_newest_first() {
        let mut log = RevisionLog::default();
        log.append_at("A", "v1", at(1));
        log.append_at("B", "other", at(2));
        log.append_at("A", "v2", at(3));

        let versions = log.versions_for("A");
        let contents: Vec<&str> = versions.iter().map(|v| v.content).collect();
        assert_eq!(contents, vec!["v2", "v1"]);
        assert_eq!(versions[0].original_index, 2);
        assert_eq!(versions[1].original_index, 0);
        assert_eq!(versions[0].time, at(3));
    }

    #[test]
    fn test_versions_for_unknown_page_is_empty() {
        let mut log = RevisionLog::default();
        log.append("A", "v1");
        assert!(log.versions_for("Nope").is_empty());
    }

    #[test]
    fn test_cap_is_global() {
        let mut log = RevisionLog::new();
        log.append_at("Rare", "only edit", at(0));
        for i in 0..100 {
            log.append_at("Busy", &format!("edit {i}"), at(i + 1));
        }

        assert_eq!(log.len(), 100);
        assert!(log.versions_for("Rare").is_empty());
        assert_eq!(log.get(0).map(|r| r.content.as_str()), Some("edit 0"));
        assert_eq!(log.get(100), None);
    }

    #[test]
    fn test_append_returns_position_after_eviction() {
        let mut log = RevisionLog::with_cap(2);
        assert_eq!(log.append("A", "1"), 0);
        assert_eq!(log.append("A", "2"), 1);
        assert_eq!(log.append("A", "3"), 1);
        assert_eq!(log.get(0).unwrap().content, "2");
    }

    #[test]
    fn test_from_entries_keeps_newest() {
        let entries: Vec<Revision> = (0..5)
            .map(|i| Revision {
                page: "P".to_string(),
                time: at(i),
                content: i.to_string(),
            })
            .collect();
        let mut log = RevisionLog::with_cap(3);
        log.replace_all(entries);
        let contents: Vec<&str> = log.entries().iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, vec!["2", "3", "4"]);
    }

    #[test]
    fn test_from_entries_applies_fixed_cap() {
        let entries: Vec<Revision> = (0..150)
            .map(|i| Revision {
                page: "P".to_string(),
                time: at(i),
                content: i.to_string(),
            })
            .collect();
        let log = RevisionLog::from_entries(entries);
        assert_eq!(log.len(), HISTORY_CAP);
        assert_eq!(log.get(0).map(|r| r.content.as_str()), Some("50"));
    }

    #[test]
    fn test_wire_format() {
        let raw = r#"[{"page":"Home","time":"2024-03-01T09:30:00.000Z","content":"hi"}]"#;
        let entries: Vec<Revision> = serde_json::from_str(raw).unwrap();
        assert_eq!(entries[0].page, "Home");
        assert_eq!(entries[0].time, Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap());

        let json = serde_json::to_value(&entries[0]).unwrap();
        assert_eq!(json["time"], "2024-03-01T09:30:00Z");
    }

    proptest! {
        #[test]
        fn prop_cap_evicts_oldest(pages in proptest::collection::vec(0u8..4, 0..250)) {
            let mut log = RevisionLog::new();
            for (i, page) in pages.iter().enumerate() {
                log.append(&format!("P{page}"), &i.to_string());
            }

            prop_assert!(log.len() <= HISTORY_CAP);
            let kept = pages.len().min(HISTORY_CAP);
            let first_kept = pages.len() - kept;
            let contents: Vec<String> = log.entries().iter().map(|r| r.content.clone()).collect();
            let expected: Vec<String> = (first_kept..pages.len()).map(|i| i.to_string()).collect();
            prop_assert_eq!(contents, expected);
        }
    }
}
