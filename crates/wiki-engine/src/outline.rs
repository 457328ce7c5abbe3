//! Numbered table of contents.
//!
//! Headings are numbered hierarchically relative to the shallowest level on
//! the page: with `##` as the top level, `##` headings count 1, 2, 3 and the
//! `###` headings beneath them count 1.1, 1.2 and so on.

use crate::links::rewrite_wiki_links;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};

const MAX_DEPTH: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    /// Dotted number, e.g. `2.1`.
    pub number: String,
    /// Plain heading text.
    pub text: String,
    /// Markdown heading level, 1 to 6.
    pub level: u8,
    /// Nesting below the shallowest heading on the page.
    pub depth: usize,
}

/// Build the outline of a markdown page.
pub fn outline(markdown: &str) -> Vec<OutlineEntry> {
    let headings = collect_headings(markdown);
    let Some(min_level) = headings.iter().map(|(level, _)| *level).min() else {
        return Vec::new();
    };

    let mut counters = [0usize; MAX_DEPTH];
    headings
        .into_iter()
        .map(|(level, text)| {
            let depth = usize::from(level - min_level);
            counters[depth] += 1;
            for counter in counters.iter_mut().skip(depth + 1) {
                *counter = 0;
            }
            let number = counters[..=depth]
                .iter()
                .map(usize::to_string)
                .collect::<Vec<_>>()
                .join(".");
            OutlineEntry {
                number,
                text,
                level,
                depth,
            }
        })
        .collect()
}

fn collect_headings(markdown: &str) -> Vec<(u8, String)> {
    let source = rewrite_wiki_links(markdown);
    let mut headings = Vec::new();
    let mut current: Option<(u8, String)> = None;

    for event in Parser::new(&source) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                current = Some((level as u8, String::new()));
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, buffer)) = current.as_mut() {
                    buffer.push_str(&text);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, text)) = current.take() {
                    headings.push((level, text.trim().to_string()));
                }
            }
            _ => {}
        }
    }

    headings
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn numbers(markdown: &str) -> Vec<(String, String)> {
        outline(markdown)
            .into_iter()
            .map(|entry| (entry.number, entry.text))
            .collect()
    }

    fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
        expected
            .iter()
            .map(|(n, t)| (n.to_string(), t.to_string()))
            .collect()
    }

    #[test]
    fn test_hierarchical_numbering() {
        let markdown = "# Intro\n\n## Setup\n\n## Usage\n\n### Flags\n\n# Appendix\n\n## Links\n";
        assert_eq!(
            numbers(markdown),
            pairs(&[
                ("1", "Intro"),
                ("1.1", "Setup"),
                ("1.2", "Usage"),
                ("1.2.1", "Flags"),
                ("2", "Appendix"),
                ("2.1", "Links"),
            ])
        );
    }

    #[test]
    fn test_depth_is_relative_to_shallowest() {
        let entries = outline("## One\n\n### One A\n\n## Two\n");
        assert_eq!(entries[0].depth, 0);
        assert_eq!(entries[0].level, 2);
        assert_eq!(entries[1].depth, 1);
        assert_eq!(entries[2].number, "2");
    }

    #[test]
    fn test_deeper_first_heading_keeps_zero_prefix() {
        assert_eq!(
            numbers("### Early\n\n# Top\n"),
            pairs(&[("0.0.1", "Early"), ("1", "Top")])
        );
    }

    #[test]
    fn test_heading_text_with_links_and_code() {
        assert_eq!(
            numbers("## See [[Notes|the notes]] and `code`\n"),
            pairs(&[("1", "See the notes and code")])
        );
    }

    #[test]
    fn test_no_headings() {
        assert!(outline("just text\n\n- item").is_empty());
        assert!(outline("").is_empty());
    }
}
