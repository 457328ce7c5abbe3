//! Backup bundles.
//!
//! An export is a single JSON document `{ pages, history, exportedAt }`.
//! Imports accept the same shape and are validated completely before the
//! engine touches any state.

use crate::error::{EngineError, EngineResult};
use crate::revisions::Revision;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportBundle<'a> {
    pages: &'a BTreeMap<String, String>,
    history: &'a [Revision],
    exported_at: DateTime<Utc>,
}

/// Serialize pages and history into a pretty-printed bundle.
pub fn export_bundle(
    pages: &BTreeMap<String, String>,
    history: &[Revision],
    exported_at: DateTime<Utc>,
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&ExportBundle {
        pages,
        history,
        exported_at,
    })
}

/// Suggested file name for a backup taken at `date`.
pub fn backup_file_name(date: DateTime<Utc>) -> String {
    format!("personal-wiki-backup-{}.json", date.format("%Y-%m-%d"))
}

/// A validated import payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportBundle {
    /// Pages in the order they appear in the payload.
    pub pages: Vec<(String, String)>,
    pub history: Vec<Revision>,
}

impl ImportBundle {
    /// Validate a raw payload.
    ///
    /// `pages` must be a mapping of names to strings. `history` is optional;
    /// anything other than an array counts as empty, but an array holding a
    /// malformed entry rejects the whole payload.
    pub fn parse(raw: &str) -> EngineResult<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| EngineError::InvalidImport(format!("not valid JSON: {}", e)))?;

        let Some(Value::Object(map)) = value.get("pages") else {
            return Err(EngineError::InvalidImport(
                "`pages` is missing or is not a mapping".to_string(),
            ));
        };

        let mut pages = Vec::with_capacity(map.len());
        for (name, content) in map {
            let Value::String(content) = content else {
                return Err(EngineError::InvalidImport(format!(
                    "content of page `{}` is not text",
                    name
                )));
            };
            if name.is_empty() {
                return Err(EngineError::InvalidImport(
                    "page names must not be empty".to_string(),
                ));
            }
            pages.push((name.clone(), content.clone()));
        }

        let history = match value.get("history") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| serde_json::from_value::<Revision>(item.clone()))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| EngineError::InvalidImport(format!("malformed history: {}", e)))?,
            _ => Vec::new(),
        };

        Ok(Self { pages, history })
    }

    /// First page name as it appeared in the payload.
    pub fn first_page(&self) -> Option<&str> {
        self.pages.first().map(|(name, _)| name.as_str())
    }

    pub fn page_map(&self) -> BTreeMap<String, String> {
        self.pages.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_keeps_payload_order() {
        let bundle =
            ImportBundle::parse(r#"{"pages":{"Zeta":"z","Alpha":"a"},"history":[]}"#).unwrap();
        assert_eq!(bundle.first_page(), Some("Zeta"));
        assert_eq!(bundle.page_map().len(), 2);
        assert!(bundle.history.is_empty());
    }

    #[test]
    fn test_parse_history_entries() {
        let raw = r#"{
            "pages": {"X": "hi"},
            "history": [{"page": "X", "time": "2024-01-02T03:04:05.000Z", "content": "old"}],
            "exportedAt": "2024-01-03T00:00:00.000Z"
        }"#;
        let bundle = ImportBundle::parse(raw).unwrap();
        assert_eq!(bundle.history.len(), 1);
        assert_eq!(bundle.history[0].content, "old");
    }

    #[test]
    fn test_non_array_history_is_empty() {
        let bundle = ImportBundle::parse(r#"{"pages":{"X":"hi"},"history":"nope"}"#).unwrap();
        assert!(bundle.history.is_empty());
    }

    #[test]
    fn test_rejections() {
        let cases = [
            "not json",
            r#"{"history":[]}"#,
            r#"{"pages":["X"]}"#,
            r#"{"pages":"X"}"#,
            r#"{"pages":{"X":1}}"#,
            r#"{"pages":{"":"empty name"}}"#,
            r#"{"pages":{"X":"hi"},"history":[{"page":"X"}]}"#,
        ];
        for raw in cases {
            assert!(
                matches!(ImportBundle::parse(raw), Err(EngineError::InvalidImport(_))),
                "accepted {raw}"
            );
        }
    }

    #[test]
    fn test_export_shape() {
        let pages = BTreeMap::from([("Home".to_string(), "hi".to_string())]);
        let at = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let history = vec![Revision {
            page: "Home".to_string(),
            time: at,
            content: "hi".to_string(),
        }];
        let raw = export_bundle(&pages, &history, at).unwrap();
        let json: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["pages"]["Home"], "hi");
        assert_eq!(json["history"][0]["page"], "Home");
        assert_eq!(json["exportedAt"], "2024-05-06T07:08:09Z");

        let reimported = ImportBundle::parse(&json.to_string()).unwrap();
        assert_eq!(reimported.history, history);
    }

    #[test]
    fn test_backup_file_name() {
        let at = Utc.with_ymd_and_hms(2024, 5, 6, 23, 0, 0).unwrap();
        assert_eq!(backup_file_name(at), "personal-wiki-backup-2024-05-06.json");
    }
}
