//! Page storage.

use crate::collation;
use crate::view::{Mode, ViewState};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// How page listings are ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Collated by name.
    #[default]
    #[serde(alias = "alpha")]
    Alphabetical,
    /// Most recently visited first.
    Recent,
}

impl SortMode {
    pub fn toggle(self) -> Self {
        match self {
            SortMode::Alphabetical => SortMode::Recent,
            SortMode::Recent => SortMode::Alphabetical,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortMode::Alphabetical => "A-Z",
            SortMode::Recent => "Recent",
        }
    }
}

/// The page-name to content mapping.
///
/// Pages are only ever created or overwritten; nothing is removed except by
/// a wholesale [`replace_all`](DocumentStore::replace_all).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentStore {
    pages: BTreeMap<String, String>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pages(pages: BTreeMap<String, String>) -> Self {
        Self { pages }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pages.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.pages.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn pages(&self) -> &BTreeMap<String, String> {
        &self.pages
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pages.keys().map(String::as_str)
    }

    /// Make sure `name` exists, creating it with `stub()` if not.
    ///
    /// Returns `true` when the page was created.
    pub fn ensure(&mut self, name: &str, stub: impl FnOnce() -> String) -> bool {
        if self.pages.contains_key(name) {
            return false;
        }
        self.pages.insert(name.to_string(), stub());
        true
    }

    /// Overwrite (or create) a page.
    pub fn set(&mut self, name: &str, content: impl Into<String>) {
        self.pages.insert(name.to_string(), content.into());
    }

    pub fn replace_all(&mut self, pages: BTreeMap<String, String>) {
        self.pages = pages;
    }

    /// Names in collated order.
    pub fn sorted_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.pages.keys().cloned().collect();
        collation::sort_names(&mut names);
        names
    }

    /// Pages whose name or content contains `query`, ignoring case.
    pub fn search(&self, query: &str) -> Vec<String> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        let mut hits: Vec<String> = self
            .pages
            .iter()
            .filter(|(name, content)| {
                name.to_lowercase().contains(&query) || content.to_lowercase().contains(&query)
            })
            .map(|(name, _)| name.clone())
            .collect();
        collation::sort_names(&mut hits);
        hits
    }
}

/// Keep only the names containing `query`, ignoring case.
pub fn filter_names(names: Vec<String>, query: &str) -> Vec<String> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return names;
    }
    names
        .into_iter()
        .filter(|name| name.to_lowercase().contains(&query))
        .collect()
}

/// Persisted shape of the documents blob.
///
/// The view cursor lives alongside the pages so a restart resumes where the
/// user left off. Only `pages` is required; a cursor field that is missing or
/// malformed falls back to its default and is repaired on open.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentsRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub current: String,
    pub pages: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "lenient")]
    pub mode: Mode,
    #[serde(default, deserialize_with = "lenient")]
    pub history_page: Option<String>,
    #[serde(default, rename = "historyIdx", deserialize_with = "lenient")]
    pub history_index: Option<usize>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

impl DocumentsRecord {
    pub fn from_parts(documents: &DocumentStore, view: &ViewState) -> Self {
        Self {
            current: view.current.clone(),
            pages: documents.pages.clone(),
            mode: view.mode,
            history_page: view.history_page.clone(),
            history_index: view.history_index,
        }
    }

    pub fn into_parts(self) -> (DocumentStore, ViewState) {
        let view = ViewState {
            mode: self.mode,
            current: self.current,
            history_page: self.history_page,
            history_index: self.history_index,
        };
        (DocumentStore::from_pages(self.pages), view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> DocumentStore {
        let mut docs = DocumentStore::new();
        docs.set("Home", "Welcome, see [[Rust]]");
        docs.set("rust notes", "ownership and borrowing");
        docs.set("Garden", "tomatoes");
        docs
    }

    #[test]
    fn test_ensure_creates_once() {
        let mut docs = store();
        assert!(docs.ensure("New", || "stub".to_string()));
        assert!(!docs.ensure("New", || "other".to_string()));
        assert_eq!(docs.get("New"), Some("stub"));
        assert!(!docs.ensure("Home", || unreachable!()));
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let mut docs = store();
        assert!(docs.ensure("home", String::new));
        assert!(docs.contains("Home"));
        assert!(docs.contains("home"));
        assert_eq!(docs.len(), 4);
    }

    #[test]
    fn test_sorted_names() {
        assert_eq!(store().sorted_names(), vec!["Garden", "Home", "rust notes"]);
    }

    #[test]
    fn test_search_matches_name_and_content() {
        let docs = store();
        assert_eq!(docs.search("RUST"), vec!["Home", "rust notes"]);
        assert_eq!(docs.search("tomato"), vec!["Garden"]);
        assert!(docs.search("   ").is_empty());
    }

    #[test]
    fn test_filter_names() {
        let names = store().sorted_names();
        assert_eq!(filter_names(names.clone(), "o"), vec!["Home", "rust notes"]);
        assert_eq!(filter_names(names.clone(), ""), names);
    }

    #[test]
    fn test_record_field_names() {
        let view = ViewState {
            mode: Mode::HistoryDetail,
            current: "Home".to_string(),
            history_page: Some("Home".to_string()),
            history_index: Some(3),
        };
        let record = DocumentsRecord::from_parts(&store(), &view);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["current"], "Home");
        assert_eq!(json["mode"], "historyDetail");
        assert_eq!(json["historyPage"], "Home");
        assert_eq!(json["historyIdx"], 3);
        assert_eq!(json["pages"]["Garden"], "tomatoes");
    }

    #[test]
    fn test_record_defaults_for_missing_cursor() {
        let raw = r#"{"current":"Home","pages":{"Home":"hi"}}"#;
        let (docs, view) = serde_json::from_str::<DocumentsRecord>(raw)
            .unwrap()
            .into_parts();
        assert_eq!(docs.get("Home"), Some("hi"));
        assert_eq!(view.mode, Mode::View);
        assert_eq!(view.history_index, None);
    }

    #[test]
    fn test_malformed_cursor_keeps_pages() {
        let raw = r#"{"current":7,"pages":{"Home":"hi","Notes":"my notes"},
            "mode":"preview","historyPage":["x"],"historyIdx":"two"}"#;
        let (docs, view) = serde_json::from_str::<DocumentsRecord>(raw)
            .unwrap()
            .into_parts();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs.get("Notes"), Some("my notes"));
        assert_eq!(view.mode, Mode::View);
        assert_eq!(view.current, "");
        assert_eq!(view.history_page, None);
        assert_eq!(view.history_index, None);
    }

    #[test]
    fn test_unreadable_pages_reject_record() {
        let raw = r#"{"current":"Home","pages":["Home"]}"#;
        assert!(serde_json::from_str::<DocumentsRecord>(raw).is_err());
    }

    #[test]
    fn test_sort_mode_accepts_short_alias() {
        let mode: SortMode = serde_json::from_str("\"alpha\"").unwrap();
        assert_eq!(mode, SortMode::Alphabetical);
        assert_eq!(mode.toggle(), SortMode::Recent);
    }
}
