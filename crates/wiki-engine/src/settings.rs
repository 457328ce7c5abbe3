//! Engine settings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Page seeded on first start and used for empty link targets.
    #[serde(default = "default_home_page")]
    pub home_page: String,
    /// Body line of pages created from a reference.
    #[serde(default = "default_stub_line")]
    pub stub_line: String,
}

fn default_home_page() -> String { "Home".to_string() }
fn default_stub_line() -> String { "Start writing this page.".to_string() }

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            home_page: default_home_page(),
            stub_line: default_stub_line(),
        }
    }
}

impl EngineSettings {
    /// Content of a page materialized from a reference.
    pub fn stub_body(&self, name: &str) -> String {
        format!("# {}\n\n{}", name, self.stub_line)
    }

    /// Content of the home page on first start.
    pub fn welcome_body(&self) -> String {
        [
            format!("# {}", self.home_page),
            String::new(),
            "Welcome to your personal wiki.".to_string(),
            String::new(),
            "## Getting started".to_string(),
            String::new(),
            "Create a few pages: [[First Note]], [[Ideas]]".to_string(),
            String::new(),
            "Type a page name at the command prompt to open it, creating it if it does not exist. \
             Type `all` to list every page and `:history` to browse the revisions \
             of the current page."
                .to_string(),
            String::new(),
            "## Notes".to_string(),
            String::new(),
            "Everything is stored on this machine only. Export a backup from time to time."
                .to_string(),
        ]
        .join("\n")
    }

    /// Content of the home page after the stored pages could not be read.
    pub fn recovery_body(&self) -> String {
        format!(
            "# {}\n\nThe saved pages could not be read, so the wiki was reset.",
            self.home_page
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_body() {
        let settings = EngineSettings::default();
        assert_eq!(settings.stub_body("Notes"), "# Notes\n\nStart writing this page.");
    }

    #[test]
    fn test_partial_settings_use_defaults() {
        let settings: EngineSettings =
            serde_json::from_str(r#"{"stub_line":"TODO","history_cap":500}"#).unwrap();
        assert_eq!(settings.home_page, "Home");
        assert_eq!(settings.stub_body("X"), "# X\n\nTODO");
    }

    #[test]
    fn test_welcome_links_to_starter_pages() {
        let body = EngineSettings::default().welcome_body();
        assert!(body.starts_with("# Home\n"));
        assert_eq!(crate::links::parse_links(&body), vec!["First Note", "Ideas"]);
    }
}
