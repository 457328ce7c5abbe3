//! Pinned pages.
//!
//! The stored order is user-defined and persisted verbatim. Pins naming a
//! page that does not exist are hidden when read but kept, so a page
//! recreated under the same name gets its pin and position back.

use crate::documents::DocumentStore;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PinStore {
    names: Vec<String>,
}

impl<'de> Deserialize<'de> for PinStore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        Ok(Self::from_names(names))
    }
}

impl PinStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store, collapsing duplicates to their first occurrence.
    pub fn from_names(names: impl IntoIterator<Item = String>) -> Self {
        let mut seen = HashSet::new();
        Self {
            names: names
                .into_iter()
                .filter(|name| seen.insert(name.clone()))
                .collect(),
        }
    }

    /// Pin `name` at the end, or unpin it if already pinned.
    ///
    /// Returns whether the page is pinned afterwards.
    pub fn toggle(&mut self, name: &str) -> bool {
        if let Some(pos) = self.names.iter().position(|pinned| pinned == name) {
            self.names.remove(pos);
            false
        } else {
            self.names.push(name.to_string());
            true
        }
    }

    /// Replace the stored order wholesale.
    pub fn reorder(&mut self, names: impl IntoIterator<Item = String>) {
        *self = Self::from_names(names);
    }

    /// Pins whose page exists, in stored order.
    pub fn visible_pins<'a>(&'a self, documents: &DocumentStore) -> Vec<&'a str> {
        self.names
            .iter()
            .map(String::as_str)
            .filter(|name| documents.contains(name))
            .collect()
    }

    pub fn is_pinned(&self, name: &str) -> bool {
        self.names.iter().any(|pinned| pinned == name)
    }

    /// Every stored pin, including hidden ones.
    pub fn stored(&self) -> &[String] {
        &self.names
    }
}
