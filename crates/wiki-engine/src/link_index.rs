//! Outgoing-link table and backlink queries.
//!
//! The table is a cache derived from page content. It is patched one page at
//! a time on every save or creation and rebuilt wholesale whenever pages are
//! replaced in bulk. Backlinks are answered with a linear scan, which is fine
//! for a single user's notes and keeps the persisted shape trivial to rebuild.

use crate::collation;
use crate::documents::DocumentStore;
use crate::links::parse_links;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkIndex {
    entries: BTreeMap<String, Vec<String>>,
}

impl LinkIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from scratch.
    pub fn build(documents: &DocumentStore) -> Self {
        let mut index = Self::new();
        index.rebuild_all(documents);
        index
    }

    /// Recompute every entry from page content, dropping entries for pages
    /// that no longer exist.
    pub fn rebuild_all(&mut self, documents: &DocumentStore) {
        self.entries = documents
            .pages()
            .iter()
            .map(|(name, content)| (name.clone(), parse_links(content)))
            .collect();
    }

    /// Recompute the entry of a single page.
    pub fn update_one(&mut self, name: &str, content: &str) {
        self.entries.insert(name.to_string(), parse_links(content));
    }

    /// Pages referenced by `name`, in discovery order.
    pub fn outgoing(&self, name: &str) -> &[String] {
        self.entries.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Pages other than `name` that link to it, collated.
    pub fn backlinks_of(&self, name: &str) -> Vec<String> {
        let mut backlinks: Vec<String> = self
            .entries
            .iter()
            .filter(|(source, targets)| {
                source.as_str() != name && targets.iter().any(|target| target == name)
            })
            .map(|(source, _)| source.clone())
            .collect();
        collation::sort_names(&mut backlinks);
        backlinks
    }

    /// Link targets without a page, with the number of pages referencing
    /// each, most referenced first.
    pub fn wanted_pages(&self, documents: &DocumentStore) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for targets in self.entries.values() {
            for target in targets {
                if !documents.contains(target) {
                    *counts.entry(target.as_str()).or_default() += 1;
                }
            }
        }
        let mut wanted: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(name, count)| (name.to_string(), count))
            .collect();
        wanted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| collation::compare(&a.0, &b.0)));
        wanted
    }

    /// Existing pages that no other page links to, collated.
    pub fn orphans(&self, documents: &DocumentStore) -> Vec<String> {
        let mut orphans: Vec<String> = documents
            .names()
            .filter(|name| self.backlinks_of(name).is_empty())
            .map(str::to_string)
            .collect();
        collation::sort_names(&mut orphans);
        orphans
    }

    /// Number of pages with an entry.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of outgoing references.
    pub fn link_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn documents(pages: &[(&str, &str)]) -> DocumentStore {
        let mut docs = DocumentStore::new();
        for (name, content) in pages {
            docs.set(name, *content);
        }
        docs
    }

    #[test]
    fn test_build_and_outgoing() {
        let docs = documents(&[("Home", "[[Notes]] and [x](Ideas)"), ("Notes", "plain")]);
        let index = LinkIndex::build(&docs);
        assert_eq!(index.outgoing("Home"), ["Notes", "Ideas"]);
        assert!(index.outgoing("Notes").is_empty());
        assert!(index.outgoing("Missing").is_empty());
        assert_eq!(index.link_count(), 2);
    }

    #[test]
    fn test_backlinks_sorted_and_exclude_self() {
        let docs = documents(&[
            ("zeta", "[[Target]]"),
            ("Alpha", "[[Target]]"),
            ("Target", "[[Target]] self link"),
            ("beta", "[go](Target)"),
            ("Unrelated", "[[Other]]"),
        ]);
        let index = LinkIndex::build(&docs);
        assert_eq!(index.backlinks_of("Target"), vec!["Alpha", "beta", "zeta"]);
    }

    #[test]
    fn test_update_one_adds_and_removes_backlinks() {
        let docs = documents(&[("A", "nothing"), ("B", "")]);
        let mut index = LinkIndex::build(&docs);
        assert!(index.backlinks_of("B").is_empty());

        index.update_one("A", "now links [[B]]");
        assert_eq!(index.backlinks_of("B"), vec!["A"]);

        index.update_one("A", "link removed");
        assert!(index.backlinks_of("B").is_empty());
    }

    #[test]
    fn test_rebuild_drops_stale_entries() {
        let mut index = LinkIndex::build(&documents(&[("Old", "[[X]]")]));
        index.rebuild_all(&documents(&[("X", "fresh")]));
        assert!(index.backlinks_of("X").is_empty());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_wanted_and_orphans() {
        let docs = documents(&[
            ("Home", "[[Notes]] [[Todo]] [[Ideas]]"),
            ("Notes", "[[Todo]]"),
            ("Lonely", "nobody links here"),
        ]);
        let index = LinkIndex::build(&docs);
        assert_eq!(
            index.wanted_pages(&docs),
            vec![("Todo".to_string(), 2), ("Ideas".to_string(), 1)]
        );
        assert_eq!(index.orphans(&docs), vec!["Home", "Lonely"]);
    }

    #[test]
    fn test_serializes_as_plain_mapping() {
        let index = LinkIndex::build(&documents(&[("Home", "[[Notes]]")]));
        let json = serde_json::to_string(&index).unwrap();
        assert_eq!(json, r#"{"Home":["Notes"]}"#);
        let back: LinkIndex = serde_json::from_str(&json).unwrap();
        assert_eq!(back, index);
    }
}
